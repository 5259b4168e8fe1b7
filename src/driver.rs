use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cell::{Row, Table};
use crate::config::{vprint, Config};
use crate::error::{IncognitoError, IncognitoResult};
use crate::evaluator::is_k_anonymous;
use crate::lattice::node::NodeId;
use crate::lattice::Lattice;
use crate::vector::Vector;
use crate::vgh::VghStore;

/// Runs the driver loop on a single lattice: BFS by ascending height, evaluating each live,
/// unmarked root or frontier node and propagating marks/deletions according to monotonicity.
fn drive(
    lattice: &mut Lattice,
    table: &Table,
    vgh: &VghStore,
    k: u32,
    cancel: Option<&AtomicBool>,
) -> IncognitoResult<()> {
    let mut queue: BinaryHeap<Reverse<(u32, NodeId)>> = lattice
        .roots()
        .map(|id| Reverse((lattice.node(id).height, id)))
        .collect();

    while let Some(Reverse((_, id))) = queue.pop() {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                break;
            }
        }

        let node = lattice.node(id);
        if node.deleted || node.marked {
            continue;
        }

        let vector = lattice.to_vector(id);
        if is_k_anonymous(table, vgh, &vector, k)? {
            lattice.mark(id);
            for successor in lattice.node(id).up.clone() {
                lattice.mark(successor);
            }
        } else {
            let successors = lattice.node(id).up.clone();
            lattice.drop_node(id);
            for successor in successors {
                let successor_node = lattice.node(successor);
                if !successor_node.marked && !successor_node.deleted {
                    queue.push(Reverse((successor_node.height, successor)));
                }
            }
        }
    }

    Ok(())
}

/// Runs the full bottom-up Incognito search over `columns`, in the given order, returning every
/// minimal generalization vector under which `table` is k-anonymous.
///
/// `cancel`, when given, is polled once per dequeue; setting it causes the search to stop early
/// and return whatever has been proven minimal so far instead of the complete set.
pub fn run(
    table: &Table,
    columns: &[String],
    vgh: &VghStore,
    k: u32,
    cancel: Option<&AtomicBool>,
) -> IncognitoResult<Vec<Vector>> {
    run_verbose(table, columns, vgh, k, cancel, None)
}

/// Same as [`run`], additionally writing `vprint`-gated progress lines through `config` when
/// verbose mode is on.
pub fn run_verbose(
    table: &Table,
    columns: &[String],
    vgh: &VghStore,
    k: u32,
    cancel: Option<&AtomicBool>,
    config: Option<&Config>,
) -> IncognitoResult<Vec<Vector>> {
    if columns.is_empty() {
        return Err(IncognitoError::EmptyQuasiIdentifierSet);
    }
    if k < 1 {
        return Err(IncognitoError::InvalidK(k as i64));
    }

    for column in columns {
        if !vgh.has_column(column) {
            return Err(IncognitoError::UnknownColumn(column.clone()));
        }
        if table.schema.column_index(column).is_none() {
            return Err(IncognitoError::UnknownColumn(column.clone()));
        }
    }

    if let Some(cfg) = config {
        vprint(cfg, &format!("seeding single-attribute lattice for {}", columns[0]));
    }

    let mut lattice = Lattice::seed_chain(columns[0].clone(), vgh.max_level(&columns[0]));
    drive(&mut lattice, table, vgh, k, cancel)?;

    for column in &columns[1..] {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                break;
            }
        }

        if let Some(cfg) = config {
            vprint(cfg, &format!("extending lattice with {}", column));
        }

        let mut chain = Lattice::seed_chain(column.clone(), vgh.max_level(column));
        drive(&mut chain, table, vgh, k, cancel)?;

        let mut extended = lattice.extend_by_one_attribute(column, vgh.max_level(column));
        extended.reconstruct(&chain)?;
        drive(&mut extended, table, vgh, k, cancel)?;
        lattice = extended;
    }

    let minimal = lattice
        .live_ids()
        .filter(|&id| {
            let node = lattice.node(id);
            node.marked
                && node
                    .down
                    .iter()
                    .all(|&predecessor| !lattice.node(predecessor).marked)
        })
        .map(|id| lattice.to_vector(id))
        .collect();

    Ok(minimal)
}

/// Rewrites every row of `table` through `vgh`'s generalization for the columns named in `g`,
/// leaving every other column untouched.
pub fn materialize(table: &Table, vgh: &VghStore, g: &Vector) -> IncognitoResult<Table> {
    let mut rows = Vec::with_capacity(table.len());
    for row in &table.rows {
        let cells = vgh.generalize_row(&row.cells, &table.schema, g)?;
        rows.push(Row::new(cells));
    }
    Ok(Table::new(table.schema.clone(), rows))
}
