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

pub mod node;

use std::collections::{HashMap, HashSet};

use self::node::{Node, NodeId};
use crate::error::{IncognitoError, IncognitoResult};
use crate::vector::Vector;

/// The product-lattice of generalization vectors across a fixed, ordered set of attributes.
///
/// Owns an arena of [`Node`]s addressed by stable [`NodeId`]s. Edges connect nodes whose
/// vectors differ in exactly one coordinate by exactly 1; `up`/`down` adjacency lists on each
/// node are kept bidirectionally consistent, so [`Lattice::drop_node`] never leaves a live node
/// pointing at a deleted one.
pub struct Lattice {
    attributes: Vec<String>,
    nodes: Vec<Node>,
    index: HashMap<Vec<u32>, NodeId>,
    /// Vectors of nodes dropped from this lattice, kept around so [`Lattice::reconstruct`] can
    /// project a larger lattice's nodes down onto this one's attribute set.
    dropped: HashSet<Vec<u32>>,
}

impl Lattice {
    fn empty(attributes: Vec<String>) -> Lattice {
        Lattice {
            attributes,
            nodes: Vec::new(),
            index: HashMap::new(),
            dropped: HashSet::new(),
        }
    }

    /// Builds the single-attribute chain `0 -> 1 -> ... -> max_level`.
    pub fn seed_chain(column: String, max_level: u32) -> Lattice {
        let mut lattice = Lattice::empty(vec![column]);
        let mut previous = None;
        for level in 0..=max_level {
            let id = lattice.insert_node(vec![level], level);
            if let Some(prev) = previous {
                lattice.connect(prev, id);
            }
            previous = Some(id);
        }
        lattice
    }

    fn insert_node(&mut self, vector: Vec<u32>, height: u32) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(vector.clone(), height));
        self.index.insert(vector, id);
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes[from.0].up.contains(&to) {
            self.nodes[from.0].up.push(to);
        }
        if !self.nodes[to.0].down.contains(&from) {
            self.nodes[to.0].down.push(from);
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live (non-deleted) node ids, in creation order.
    pub fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(move |id| !self.nodes[id.0].deleted)
    }

    /// Live nodes with no live predecessor — the seeds for the driver's BFS.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live_ids().filter(move |id| self.nodes[id.0].is_root())
    }

    pub fn find(&self, vector: &[u32]) -> Option<NodeId> {
        self.index.get(vector).copied()
    }

    /// Converts a node's internal vector representation to the public, ordered `Vector` map.
    pub fn to_vector(&self, id: NodeId) -> Vector {
        self.attributes
            .iter()
            .cloned()
            .zip(self.nodes[id.0].vector.iter().copied())
            .collect()
    }

    /// Marks `id` as k-anonymous. Does not touch neighbors; see [`Lattice::mark_ancestors`] for
    /// the transitive propagation the driver actually relies on.
    pub fn mark(&mut self, id: NodeId) {
        self.nodes[id.0].marked = true;
    }

    /// Marks `id` and every ancestor reachable via `up` edges, stopping at any node already
    /// marked (everything above an already-marked node is, by the invariant, already marked or
    /// already scheduled to be).
    pub fn mark_ancestors(&mut self, id: NodeId) {
        if self.nodes[id.0].marked {
            return;
        }
        self.nodes[id.0].marked = true;
        let successors = self.nodes[id.0].up.clone();
        for successor in successors {
            self.mark_ancestors(successor);
        }
    }

    /// Removes `id` from consideration: flags it deleted, unlinks it from every live neighbor's
    /// adjacency list, and archives its vector so [`Lattice::reconstruct`] can consult it later.
    /// Idempotent.
    pub fn drop_node(&mut self, id: NodeId) {
        if self.nodes[id.0].deleted {
            return;
        }
        self.nodes[id.0].deleted = true;
        self.dropped.insert(self.nodes[id.0].vector.clone());

        let ups = self.nodes[id.0].up.clone();
        let downs = self.nodes[id.0].down.clone();
        for up in ups {
            self.nodes[up.0].down.retain(|&n| n != id);
        }
        for down in downs {
            self.nodes[down.0].up.retain(|&n| n != id);
        }
        self.nodes[id.0].up.clear();
        self.nodes[id.0].down.clear();
    }

    /// Drops every live node of `self` whose projection onto `reference`'s attributes matches a
    /// node `reference` has already dropped.
    ///
    /// By monotonicity, if the sub-vector was not k-anonymous over `reference`, the full vector
    /// cannot be either.
    pub fn reconstruct(&mut self, reference: &Lattice) -> IncognitoResult<()> {
        let projection: Vec<usize> = reference
            .attributes
            .iter()
            .map(|col| {
                self.attributes
                    .iter()
                    .position(|c| c == col)
                    .ok_or_else(|| {
                        IncognitoError::IncompatibleLattice(format!(
                            "reference attribute {:?} not present in this lattice",
                            col
                        ))
                    })
            })
            .collect::<IncognitoResult<Vec<usize>>>()?;

        let to_drop: Vec<NodeId> = self
            .live_ids()
            .filter(|&id| {
                let projected: Vec<u32> = projection
                    .iter()
                    .map(|&idx| self.nodes[id.0].vector[idx])
                    .collect();
                reference.dropped.contains(&projected)
            })
            .collect();

        for id in to_drop {
            self.drop_node(id);
        }
        Ok(())
    }

    /// Grows this lattice by one brand-new attribute, producing `self`'s nodes crossed with
    /// `new_column`'s full `0..=new_max_level` chain.
    ///
    /// Node generation is the Apriori-style join of the original spec specialized to the case
    /// the driver always uses it in: joining against a single-attribute chain rather than a
    /// second arbitrary lattice, so every live node of `self` simply gets one copy per level of
    /// the new column. Edges are reconstructed from existing adjacency rather than recomputed
    /// from scratch: within a fixed new-column level, `self`'s own edges are reused verbatim;
    /// across adjacent new-column levels for the same `self`-node, a new vertical edge is
    /// added. No edge is ever emitted between two new nodes that are height-equal reflections
    /// of each other, since the construction above never generates such a pair.
    pub fn extend_by_one_attribute(&self, new_column: &str, new_max_level: u32) -> Lattice {
        let mut new_attributes = self.attributes.clone();
        new_attributes.push(new_column.to_string());
        let mut extended = Lattice::empty(new_attributes);

        let mut id_map: HashMap<(NodeId, u32), NodeId> = HashMap::new();

        for old_id in self.live_ids() {
            let old_node = &self.nodes[old_id.0];
            for level in 0..=new_max_level {
                let mut vector = old_node.vector.clone();
                vector.push(level);
                let new_id = extended.insert_node(vector, old_node.height + level);
                id_map.insert((old_id, level), new_id);
            }
        }

        for old_id in self.live_ids() {
            let old_node = &self.nodes[old_id.0];
            for level in 0..=new_max_level {
                let &this_id = id_map.get(&(old_id, level)).unwrap();

                if level < new_max_level {
                    let &vertical = id_map.get(&(old_id, level + 1)).unwrap();
                    extended.connect(this_id, vertical);
                }

                for &successor in &old_node.up {
                    let &horizontal = id_map.get(&(successor, level)).unwrap();
                    extended.connect(this_id, horizontal);
                }
            }
        }

        extended
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chain_has_expected_edges_and_single_root() {
        let lattice = Lattice::seed_chain("workclass".to_string(), 2);
        assert_eq!(lattice.len(), 3);
        assert_eq!(lattice.roots().count(), 1);
        let root = lattice.roots().next().unwrap();
        assert_eq!(lattice.node(root).vector, vec![0]);
        assert_eq!(lattice.node(root).up.len(), 1);
    }

    #[test]
    fn extend_by_one_attribute_produces_product_lattice() {
        let workclass = Lattice::seed_chain("workclass".to_string(), 1);
        let extended = workclass.extend_by_one_attribute("sex", 1);

        assert_eq!(extended.len(), 4);
        assert_eq!(extended.attributes(), &["workclass".to_string(), "sex".to_string()]);

        // Every edge must differ in exactly one coordinate by exactly one.
        for id in extended.live_ids() {
            let node = extended.node(id);
            for &up in &node.up {
                let up_node = extended.node(up);
                let diffs: Vec<(u32, u32)> = node
                    .vector
                    .iter()
                    .zip(up_node.vector.iter())
                    .filter(|(a, b)| a != b)
                    .map(|(&a, &b)| (a, b))
                    .collect();
                assert_eq!(diffs.len(), 1);
                assert_eq!(diffs[0].1, diffs[0].0 + 1);
                assert_eq!(up_node.height, node.height + 1);
            }
        }

        // Exactly one root: (0, 0).
        let roots: Vec<_> = extended.roots().collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(extended.node(roots[0]).vector, vec![0, 0]);

        // Every non-root node has at least one down edge.
        for id in extended.live_ids() {
            if !extended.node(id).is_root() {
                assert!(!extended.node(id).down.is_empty());
            }
        }
    }

    #[test]
    fn drop_node_is_idempotent_and_bidirectional() {
        let mut lattice = Lattice::seed_chain("sex".to_string(), 1);
        let bottom = lattice.find(&[0]).unwrap();
        let top = lattice.find(&[1]).unwrap();

        lattice.drop_node(bottom);
        assert!(lattice.node(top).down.is_empty());
        assert_eq!(lattice.live_ids().count(), 1);

        lattice.drop_node(bottom); // idempotent
        assert_eq!(lattice.live_ids().count(), 1);
    }

    #[test]
    fn reconstruct_prunes_matching_projection() {
        let mut reference = Lattice::seed_chain("workclass".to_string(), 1);
        let dropped_ref = reference.find(&[0]).unwrap();
        reference.drop_node(dropped_ref);

        let workclass = Lattice::seed_chain("workclass".to_string(), 1);
        let mut extended = workclass.extend_by_one_attribute("sex", 1);
        extended.reconstruct(&reference).unwrap();

        for id in extended.live_ids() {
            assert_ne!(extended.node(id).vector[0], 0);
        }
    }

    #[test]
    fn reconstruct_rejects_incompatible_attributes() {
        let reference = Lattice::seed_chain("education".to_string(), 1);
        let mut target = Lattice::seed_chain("workclass".to_string(), 1);
        let err = target.reconstruct(&reference).unwrap_err();
        assert!(matches!(err, IncognitoError::IncompatibleLattice(_)));
    }

    #[test]
    fn mark_ancestors_propagates_with_cutoff() {
        let mut lattice = Lattice::seed_chain("sex".to_string(), 2);
        let bottom = lattice.find(&[0]).unwrap();
        lattice.mark_ancestors(bottom);
        for id in lattice.live_ids() {
            assert!(lattice.node(id).marked);
        }
    }
}
