use std::collections::BTreeMap;

/// A generalization vector: an ordered mapping from column name to generalization level.
///
/// Using a `BTreeMap` at the public API boundary (rather than the lattice's internal
/// index-based representation) lets callers print, compare, and hash vectors without any
/// knowledge of a particular lattice's fixed attribute order.
pub type Vector = BTreeMap<String, u32>;
