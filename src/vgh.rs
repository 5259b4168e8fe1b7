use std::collections::HashMap;

use crate::cell::Cell;
use crate::error::{IncognitoError, IncognitoResult};

/// One edge of a value-generalization hierarchy tree, as produced by a loader.
///
/// `child_level` is always the level of `child` below `parent`; level 0 always means "raw,
/// ungeneralized value". Loaders normalize levels before constructing a [`VghStore`] so that
/// leaves are level 0 and each column's root sits at that column's `max_level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyEntry {
    pub column: String,
    pub child: Cell,
    pub child_level: u32,
    pub parent: Cell,
    pub parent_level: u32,
}

/// Per-(column, level) lookup tables mapping a raw value to its generalized value.
///
/// Built once from the flattened set of [`HierarchyEntry`] tuples a loader produces. Lookup is
/// a single `HashMap` probe; an unmapped raw value at a level a column actually has is a
/// hierarchy/data mismatch and is reported as [`IncognitoError::UnknownValueInHierarchy`]
/// rather than silently passed through.
pub struct VghStore {
    /// column -> level -> (raw value at level 0 -> generalized value at that level)
    levels: HashMap<String, HashMap<u32, HashMap<Cell, Cell>>>,
    max_level: HashMap<String, u32>,
}

impl VghStore {
    /// Builds a store from the flattened hierarchy entries of one or more columns.
    ///
    /// For every entry `(column, child, child_level, parent, parent_level)` this also derives
    /// the level-0-to-parent_level mapping by walking the chain down to level 0, so a lookup at
    /// any level is always a single hash probe rather than a walk up the tree.
    pub fn from_entries<I: IntoIterator<Item = HierarchyEntry>>(entries: I) -> VghStore {
        // parent[(column, child_at_level)] = (parent, parent_level), restricted to
        // immediate child_level -> child_level+1 edges.
        let mut immediate_parent: HashMap<(String, Cell, u32), Cell> = HashMap::new();
        let mut max_level: HashMap<String, u32> = HashMap::new();
        let mut leaves: HashMap<String, Vec<Cell>> = HashMap::new();

        for entry in entries {
            max_level
                .entry(entry.column.clone())
                .and_modify(|m| *m = (*m).max(entry.parent_level))
                .or_insert(entry.parent_level);

            if entry.child_level == 0 {
                leaves
                    .entry(entry.column.clone())
                    .or_default()
                    .push(entry.child.clone());
            }

            immediate_parent.insert(
                (entry.column.clone(), entry.child.clone(), entry.child_level),
                entry.parent.clone(),
            );
        }

        let mut levels: HashMap<String, HashMap<u32, HashMap<Cell, Cell>>> = HashMap::new();

        for (column, leaf_values) in &leaves {
            let column_max = *max_level.get(column).unwrap_or(&0);
            let column_levels = levels.entry(column.clone()).or_default();

            for level in 0..=column_max {
                let mut mapping = HashMap::new();
                for leaf in leaf_values {
                    let mut current = leaf.clone();
                    let mut current_level = 0u32;
                    while current_level < level {
                        match immediate_parent.get(&(column.clone(), current.clone(), current_level))
                        {
                            Some(parent) => {
                                current = parent.clone();
                                current_level += 1;
                            }
                            None => break,
                        }
                    }
                    mapping.insert(leaf.clone(), current);
                }
                column_levels.insert(level, mapping);
            }
        }

        VghStore { levels, max_level }
    }

    pub fn max_level(&self, column: &str) -> u32 {
        self.max_level.get(column).copied().unwrap_or(0)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.levels.contains_key(column)
    }

    /// Generalizes a single value: `vgh[column](value, level)`.
    pub fn generalize_value(&self, column: &str, value: &Cell, level: u32) -> IncognitoResult<Cell> {
        if level == 0 {
            return Ok(value.clone());
        }
        if value.is_null() {
            return Ok(Cell::Null);
        }
        let mapping = self
            .levels
            .get(column)
            .and_then(|levels| levels.get(&level))
            .ok_or_else(|| IncognitoError::UnknownColumn(column.to_string()))?;

        mapping.get(value).cloned().ok_or_else(|| {
            IncognitoError::UnknownValueInHierarchy(column.to_string(), value.to_string())
        })
    }

    /// Rewrites every column in `vector` to its generalized value; columns not in `vector` are
    /// left untouched.
    pub fn generalize_row(
        &self,
        row: &[Cell],
        schema: &crate::cell::Schema,
        vector: &crate::vector::Vector,
    ) -> IncognitoResult<Vec<Cell>> {
        let mut out = row.to_vec();
        for (column, level) in vector {
            if let Some(idx) = schema.column_index(column) {
                out[idx] = self.generalize_value(column, &row[idx], *level)?;
            }
        }
        Ok(out)
    }

    /// The only operation the evaluator needs: the tuple of generalized values for the columns
    /// in `vector`'s domain, in `vector`'s iteration order.
    pub fn group_key(
        &self,
        row: &[Cell],
        schema: &crate::cell::Schema,
        vector: &crate::vector::Vector,
    ) -> IncognitoResult<Vec<Cell>> {
        let mut key = Vec::with_capacity(vector.len());
        for (column, level) in vector {
            let idx = schema
                .column_index(column)
                .ok_or_else(|| IncognitoError::UnknownColumn(column.clone()))?;
            key.push(self.generalize_value(column, &row[idx], *level)?);
        }
        Ok(key)
    }
}
