use multiset::HashMultiSet;

use crate::cell::{Cell, Table};
use crate::error::IncognitoResult;
use crate::vector::Vector;
use crate::vgh::VghStore;

/// Decides whether `table`, generalized under `vector`, is k-anonymous.
///
/// Computes the multiset of `group_key(row, vector)` across every row and checks that every
/// distinct key occurs at least `k` times. An empty table is vacuously k-anonymous for any k,
/// and any k <= 1 is trivially satisfied since every group has size >= 1.
pub fn is_k_anonymous(table: &Table, vgh: &VghStore, vector: &Vector, k: u32) -> IncognitoResult<bool> {
    if table.is_empty() {
        return Ok(true);
    }
    if k <= 1 {
        return Ok(true);
    }

    let mut keys: HashMultiSet<Vec<Cell>> = HashMultiSet::new();
    for row in &table.rows {
        let key = vgh.group_key(&row.cells, &table.schema, vector)?;
        keys.insert(key);
    }

    let min_group_size = keys
        .distinct_elements()
        .map(|key| keys.count_of(key))
        .min()
        .unwrap_or(0);

    Ok(min_group_size as u32 >= k)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cell::{Row, Schema};
    use crate::vgh::HierarchyEntry;

    fn sex_table(m: usize, f: usize) -> Table {
        let schema = Schema::new(vec!["sex".to_string()]);
        let mut rows = Vec::new();
        for _ in 0..m {
            rows.push(Row::new(vec![Cell::Str("M".to_string())]));
        }
        for _ in 0..f {
            rows.push(Row::new(vec![Cell::Str("F".to_string())]));
        }
        Table::new(schema, rows)
    }

    fn sex_vgh() -> VghStore {
        VghStore::from_entries(vec![
            HierarchyEntry {
                column: "sex".to_string(),
                child: Cell::Str("M".to_string()),
                child_level: 0,
                parent: Cell::Str("Human".to_string()),
                parent_level: 1,
            },
            HierarchyEntry {
                column: "sex".to_string(),
                child: Cell::Str("F".to_string()),
                child_level: 0,
                parent: Cell::Str("Human".to_string()),
                parent_level: 1,
            },
        ])
    }

    #[test]
    fn level_zero_is_not_k_anonymous_for_unbalanced_groups() {
        let table = sex_table(7, 3);
        let vgh = sex_vgh();
        let mut vector = Vector::new();
        vector.insert("sex".to_string(), 0);
        assert!(!is_k_anonymous(&table, &vgh, &vector, 5).unwrap());
    }

    #[test]
    fn top_level_collapses_into_one_group() {
        let table = sex_table(7, 3);
        let vgh = sex_vgh();
        let mut vector = Vector::new();
        vector.insert("sex".to_string(), 1);
        assert!(is_k_anonymous(&table, &vgh, &vector, 10).unwrap());
    }

    #[test]
    fn empty_table_is_vacuously_k_anonymous() {
        let table = Table::new(Schema::new(vec!["sex".to_string()]), Vec::new());
        let vgh = sex_vgh();
        let mut vector = Vector::new();
        vector.insert("sex".to_string(), 0);
        assert!(is_k_anonymous(&table, &vgh, &vector, 1000).unwrap());
    }

    #[test]
    fn k_of_one_is_trivially_satisfied() {
        let table = sex_table(1, 0);
        let vgh = sex_vgh();
        let mut vector = Vector::new();
        vector.insert("sex".to_string(), 0);
        assert!(is_k_anonymous(&table, &vgh, &vector, 1).unwrap());
    }

    #[test]
    fn empty_vector_checks_whole_table_size() {
        let table = sex_table(3, 2);
        let vgh = sex_vgh();
        let vector = Vector::new();
        assert!(is_k_anonymous(&table, &vgh, &vector, 5).unwrap());
        assert!(!is_k_anonymous(&table, &vgh, &vector, 6).unwrap());
    }
}
