use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::cell::{Cell, Row, Schema, Table};
use crate::error::{IncognitoError, IncognitoResult};
use crate::vgh::HierarchyEntry;

/// Reads a delimited dataset file into a [`Table`].
///
/// The header row names the columns; every other row is parsed cell-by-cell with
/// [`Cell::parse`] against `na_sentinel`. `separator` is configurable because the reference
/// datasets mix `;` (`adult`, `atus`, `cup`, `fars`, `ihis`) and `,` (`ACS13_ma`).
pub fn read_dataset(path: &Path, separator: u8, na_sentinel: &str) -> IncognitoResult<Table> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let schema = Schema::new(reader.headers()?.iter().map(|s| s.to_string()).collect());

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let cells = record
            .iter()
            .map(|field| Cell::parse(field, na_sentinel))
            .collect();
        rows.push(Row::new(cells));
    }

    Ok(Table::new(schema, rows))
}

/// Reads a `;`-separated, headerless hierarchy matrix: one row per raw value, one column per
/// generalization level with level 0 leftmost.
///
/// Each adjacent column pair `(level, level+1)` contributes one [`HierarchyEntry`] per matrix
/// row, after de-duplicating identical `(child, parent)` pairs at that level. The original
/// tool this is grounded on (`read_hierarchy_official_csv`) emits every column pair, not just
/// adjacent ones, because its consumer indexes hierarchy rows directly by arbitrary level pairs.
/// `VghStore` instead walks a leaf up one level at a time via each level's immediate parent, so
/// only adjacent pairs are needed — emitting the non-adjacent ones here would in fact corrupt
/// that walk, since a raw value's one true immediate parent would collide in the lookup table
/// with its more distant ancestors at other levels.
pub fn read_hierarchy_csv_matrix(path: &Path, column: &str) -> IncognitoResult<Vec<HierarchyEntry>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut matrix: Vec<Vec<Cell>> = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        matrix.push(record.iter().map(|field| Cell::parse(field, "")).collect());
    }

    let width = matrix.first().map(|row| row.len()).unwrap_or(0);
    if width == 0 {
        return Err(IncognitoError::InvalidHierarchy(format!(
            "hierarchy file for column {:?} has no columns",
            column
        )));
    }

    let mut entries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for child_col in 0..width - 1 {
        let parent_col = child_col + 1;
        for row in &matrix {
            let child = row[child_col].clone();
            let parent = row[parent_col].clone();
            let key = (child_col, child.clone(), parent.clone());
            if !seen.insert(key) {
                continue;
            }
            entries.push(HierarchyEntry {
                column: column.to_string(),
                child,
                child_level: child_col as u32,
                parent,
                parent_level: parent_col as u32,
            });
        }
    }

    Ok(entries)
}

/// Reads a tab-indented tree hierarchy: one raw value or intermediate group per line,
/// indentation depth encodes tree depth. Leaves (the deepest indentation reached anywhere in
/// the file) are level 0; a line's level is `max_depth - depth`. A parent line is the nearest
/// preceding line whose depth is exactly one less.
///
/// Blank lines are skipped. Indentation must be tabs; each tab is one depth level.
pub fn read_hierarchy_tab_indented(path: &Path, column: &str) -> IncognitoResult<Vec<HierarchyEntry>> {
    let contents = std::fs::read_to_string(path)?;

    let lines: Vec<(usize, &str)> = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let depth = line.chars().take_while(|&c| c == '\t').count();
            (depth, line.trim())
        })
        .collect();

    let max_depth = lines.iter().map(|(depth, _)| *depth).max().unwrap_or(0);

    // ancestors[depth] = the value currently open at that depth, as we scan top to bottom.
    let mut ancestors: Vec<Cell> = Vec::new();
    let mut entries = Vec::new();

    for &(depth, value) in &lines {
        let cell = Cell::parse(value, "");
        ancestors.truncate(depth);
        ancestors.push(cell.clone());

        if depth > 0 {
            let parent = ancestors[depth - 1].clone();
            entries.push(HierarchyEntry {
                column: column.to_string(),
                child: cell,
                child_level: (max_depth - depth) as u32,
                parent,
                parent_level: (max_depth - depth + 1) as u32,
            });
        }
    }

    Ok(entries)
}

/// Reads one hierarchy file per column from `hierarchies_dir`, trying `<column>.csv` (matrix
/// form) then `<column>.tsv` (tab-indented form), and returns the flattened entry list ready
/// for [`crate::vgh::VghStore::from_entries`].
pub fn read_hierarchies(hierarchies_dir: &Path, columns: &[String]) -> IncognitoResult<Vec<HierarchyEntry>> {
    let mut entries = Vec::new();
    for column in columns {
        let csv_path = hierarchies_dir.join(format!("{}.csv", column));
        let tsv_path = hierarchies_dir.join(format!("{}.tsv", column));

        if csv_path.exists() {
            entries.extend(read_hierarchy_csv_matrix(&csv_path, column)?);
        } else if tsv_path.exists() {
            entries.extend(read_hierarchy_tab_indented(&tsv_path, column)?);
        } else {
            return Err(IncognitoError::HierarchyFileNotFound(column.clone(), csv_path));
        }
    }
    Ok(entries)
}

/// How to handle [`Cell::Null`] in the active quasi-identifier columns before search.
pub enum NaPolicy {
    /// Remove every row containing a null in any of `columns`.
    DropRows,
    /// Substitute a fixed, non-null value for every null in `columns`.
    ReplaceWith(Cell),
    /// Leave nulls as-is; they count as their own group in `group_key`.
    Keep,
}

/// Applies `policy` to `table`, restricted to `columns`.
pub fn apply_na_policy(table: Table, columns: &[String], policy: &NaPolicy) -> Table {
    match policy {
        NaPolicy::Keep => table,
        NaPolicy::DropRows => {
            let indices: Vec<usize> = columns
                .iter()
                .filter_map(|c| table.schema.column_index(c))
                .collect();
            let rows = table
                .rows
                .into_iter()
                .filter(|row| indices.iter().all(|&i| !row.cells[i].is_null()))
                .collect();
            Table::new(table.schema, rows)
        }
        NaPolicy::ReplaceWith(replacement) => {
            let indices: Vec<usize> = columns
                .iter()
                .filter_map(|c| table.schema.column_index(c))
                .collect();
            let schema = table.schema.clone();
            let rows = table
                .rows
                .into_iter()
                .map(|mut row| {
                    for &i in &indices {
                        if row.cells[i].is_null() {
                            row.cells[i] = replacement.clone();
                        }
                    }
                    row
                })
                .collect();
            Table::new(schema, rows)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_dataset_with_semicolon_separator() {
        let file = write_temp("sex;workclass\nM;Private\nF;?\n");
        let table = read_dataset(file.path(), b';', "?").unwrap();
        assert_eq!(table.schema.columns(), &["sex".to_string(), "workclass".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].cells[1], Cell::Null);
    }

    #[test]
    fn reads_hierarchy_csv_matrix_including_adjacent_pairs() {
        let file = write_temp("M;Human\nF;Human\n");
        let entries = read_hierarchy_csv_matrix(file.path(), "sex").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .any(|e| e.child == Cell::Str("M".to_string()) && e.child_level == 0 && e.parent_level == 1));
    }

    #[test]
    fn reads_tab_indented_tree() {
        let file = write_temp("Any\n\tEmployed\n\t\tPrivate\n\t\tLocal-gov\n");
        let entries = read_hierarchy_tab_indented(file.path(), "workclass").unwrap();

        let private = entries
            .iter()
            .find(|e| e.child == Cell::Str("Private".to_string()))
            .unwrap();
        assert_eq!(private.child_level, 0);
        assert_eq!(private.parent, Cell::Str("Employed".to_string()));
        assert_eq!(private.parent_level, 1);

        let employed = entries
            .iter()
            .find(|e| e.child == Cell::Str("Employed".to_string()))
            .unwrap();
        assert_eq!(employed.child_level, 1);
        assert_eq!(employed.parent, Cell::Str("Any".to_string()));
        assert_eq!(employed.parent_level, 2);
    }

    #[test]
    fn matrix_and_tab_forms_agree_on_the_same_tree() {
        use crate::vgh::VghStore;

        let matrix_file = write_temp("Private;Employed;Any\nLocal-gov;Employed;Any\n");
        let matrix_entries = read_hierarchy_csv_matrix(matrix_file.path(), "workclass").unwrap();

        let tab_file = write_temp("Any\n\tEmployed\n\t\tPrivate\n\t\tLocal-gov\n");
        let tab_entries = read_hierarchy_tab_indented(tab_file.path(), "workclass").unwrap();

        let matrix_store = VghStore::from_entries(matrix_entries);
        let tab_store = VghStore::from_entries(tab_entries);

        assert_eq!(matrix_store.max_level("workclass"), tab_store.max_level("workclass"));
        for value in ["Private", "Local-gov"] {
            let cell = Cell::Str(value.to_string());
            for level in 0..=matrix_store.max_level("workclass") {
                assert_eq!(
                    matrix_store.generalize_value("workclass", &cell, level).unwrap(),
                    tab_store.generalize_value("workclass", &cell, level).unwrap()
                );
            }
        }
    }

    #[test]
    fn drop_rows_removes_any_row_with_a_null_in_an_active_column() {
        let schema = Schema::new(vec!["sex".to_string(), "workclass".to_string()]);
        let rows = vec![
            Row::new(vec![Cell::Str("M".to_string()), Cell::Null]),
            Row::new(vec![Cell::Str("F".to_string()), Cell::Str("Private".to_string())]),
        ];
        let table = Table::new(schema, rows);
        let result = apply_na_policy(table, &["workclass".to_string()], &NaPolicy::DropRows);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn replace_with_substitutes_fixed_value() {
        let schema = Schema::new(vec!["workclass".to_string()]);
        let rows = vec![Row::new(vec![Cell::Null])];
        let table = Table::new(schema, rows);
        let replacement = Cell::Str("Unknown".to_string());
        let result = apply_na_policy(
            table,
            &["workclass".to_string()],
            &NaPolicy::ReplaceWith(replacement.clone()),
        );
        assert_eq!(result.rows[0].cells[0], replacement);
    }

    #[test]
    fn keep_preserves_null_count() {
        let schema = Schema::new(vec!["workclass".to_string()]);
        let rows = vec![Row::new(vec![Cell::Null]), Row::new(vec![Cell::Str("Private".to_string())])];
        let table = Table::new(schema, rows);
        let result = apply_na_policy(table, &["workclass".to_string()], &NaPolicy::Keep);
        assert_eq!(result.rows.iter().filter(|r| r.cells[0].is_null()).count(), 1);
    }
}
