/*
 * Copyright (c) 2021 Works Applications Co., Ltd.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

/// Stable arena index for a [`super::Lattice`] node.
///
/// Nodes are never moved or resurrected once created, so an id stays valid (though possibly
/// `deleted`) for the lifetime of the lattice that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Lattice node: a generalization vector plus its adjacency to neighbors exactly one level
/// away in exactly one coordinate.
#[derive(Debug, Clone)]
pub struct Node {
    /// Per-attribute generalization level, indexed against the owning lattice's fixed
    /// attribute order.
    pub vector: Vec<u32>,
    /// Cached sum of `vector`.
    pub height: u32,
    /// Direct successors: one coordinate incremented by 1.
    pub up: Vec<NodeId>,
    /// Direct predecessors: one coordinate decremented by 1.
    pub down: Vec<NodeId>,
    /// Proven k-anonymous, directly or by monotone implication.
    pub marked: bool,
    /// Removed from consideration; not a witness.
    pub deleted: bool,
}

impl Node {
    pub fn new(vector: Vec<u32>, height: u32) -> Node {
        Node {
            vector,
            height,
            up: Vec::new(),
            down: Vec::new(),
            marked: false,
            deleted: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.down.is_empty()
    }
}
