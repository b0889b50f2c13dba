//! Forest-aware row sorting.
//!
//! The display list is a pre-order flattening of a forest, so sorting
//! never compares rows across subtrees: sibling groups are sorted
//! independently and the list is rebuilt by traversal, which keeps every
//! child under its parent. Sibling sorts are stable, so rows that
//! compare equal on every active column keep their relative order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::column::Column;
use super::row::{RowArena, RowId};

/// The active sort columns, primary first, each with its direction.
fn active_columns(columns: &[Column]) -> Vec<(&Column, bool)> {
    let mut active: Vec<&Column> = columns
        .iter()
        .filter(|col| col.sort_sequence().is_some())
        .collect();
    active.sort_by_key(|col| col.sort_sequence());
    active
        .into_iter()
        .map(|col| (col, col.is_sort_ascending()))
        .collect()
}

fn compare_rows(
    rows: &RowArena,
    active: &[(&Column, bool)],
    a: RowId,
    b: RowId,
) -> Ordering {
    for &(column, ascending) in active {
        let value_a = rows[a].data().data(column);
        let value_b = rows[b].data().data(column);
        let ord = value_a.compare(&value_b);
        if ord != Ordering::Equal {
            return if ascending { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Sorts the display list by the active sort columns.
///
/// Rows are grouped by their displayed parent (rows whose parent is not
/// itself displayed count as top-level), each group is stable-sorted,
/// and the list is rebuilt in pre-order.
pub(crate) fn sort_display(rows: &RowArena, columns: &[Column], display: &mut Vec<RowId>) {
    let active = active_columns(columns);
    if active.is_empty() || display.len() < 2 {
        return;
    }

    let displayed: HashSet<RowId> = display.iter().copied().collect();
    let mut top_level = Vec::new();
    let mut groups: HashMap<RowId, Vec<RowId>> = HashMap::new();
    for &id in display.iter() {
        match rows[id].parent().filter(|parent| displayed.contains(parent)) {
            Some(parent) => groups.entry(parent).or_default().push(id),
            None => top_level.push(id),
        }
    }

    top_level.sort_by(|&a, &b| compare_rows(rows, &active, a, b));
    for group in groups.values_mut() {
        group.sort_by(|&a, &b| compare_rows(rows, &active, a, b));
    }

    let mut rebuilt = Vec::with_capacity(display.len());
    for &id in &top_level {
        emit(id, &groups, &mut rebuilt);
    }
    debug_assert_eq!(rebuilt.len(), display.len());
    *display = rebuilt;
}

fn emit(row: RowId, groups: &HashMap<RowId, Vec<RowId>>, out: &mut Vec<RowId>) {
    out.push(row);
    if let Some(children) = groups.get(&row) {
        for &child in children {
            emit(child, groups, out);
        }
    }
}

/// Stable-sorts every container's stored child list by the active sort
/// columns, including containers that are closed or not displayed.
pub(crate) fn sort_children(rows: &mut RowArena, columns: &[Column]) {
    let active = active_columns(columns);
    if active.is_empty() {
        return;
    }
    let ids: Vec<RowId> = rows.keys().collect();
    for id in ids {
        let Some(mut children) = rows[id].children_mut().map(std::mem::take) else {
            continue;
        };
        children.sort_by(|&a, &b| compare_rows(rows, &active, a, b));
        *rows[id].children_mut().expect("container checked above") = children;
    }
}
