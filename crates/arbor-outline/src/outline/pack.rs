//! Column width packing.
//!
//! Packing distributes an available pixel width across the visible
//! columns. Every visible column starts at its preferred width (floored
//! at its minimum). A surplus goes to the first visible column; a
//! deficit is taken from the shrink-participating columns in proportion
//! to their slack above minimum, in repeated passes so no column ever
//! drops below its minimum. All arithmetic is integral; within a pass
//! the last pool column absorbs the rounding remainder, so the packed
//! widths sum exactly to the available width whenever the minimums
//! permit.

use arbor_outline_core::logging::targets;
use tracing::trace;

use super::column::Column;

/// Packs the visible columns into `available` pixels and returns the ids
/// of the columns whose width changed.
pub(crate) fn pack(columns: &mut [Column], available: i32) -> Vec<u32> {
    let visible: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, col)| col.is_visible())
        .map(|(index, _)| index)
        .collect();
    if visible.is_empty() {
        return Vec::new();
    }

    let mut widths: Vec<i32> = visible
        .iter()
        .map(|&index| columns[index].preferred_width().max(columns[index].minimum_width()))
        .collect();
    let total: i32 = widths.iter().sum();

    if total < available {
        widths[0] += available - total;
    } else if total > available {
        shrink(columns, &visible, &mut widths, total - available);
    }

    let mut changed = Vec::new();
    for (&index, &width) in visible.iter().zip(widths.iter()) {
        if columns[index].raw_width() != width {
            columns[index].set_width(width);
            changed.push(columns[index].id());
        }
    }
    trace!(
        target: targets::PACK,
        available,
        changed = changed.len(),
        "packed columns"
    );
    changed
}

/// Takes `deficit` pixels from the shrinkable columns, proportionally to
/// their slack above minimum.
///
/// Each pass either clears the deficit or drives at least one column to
/// its minimum, so the loop runs at most once per column.
fn shrink(columns: &[Column], visible: &[usize], widths: &mut [i32], mut deficit: i32) {
    while deficit > 0 {
        let pool: Vec<usize> = visible
            .iter()
            .enumerate()
            .filter(|&(pos, &index)| {
                columns[index].shrinks() && widths[pos] > columns[index].minimum_width()
            })
            .map(|(pos, _)| pos)
            .collect();
        if pool.is_empty() {
            break;
        }
        let slack_total: i64 = pool
            .iter()
            .map(|&pos| i64::from(widths[pos] - columns[visible[pos]].minimum_width()))
            .sum();
        if slack_total <= i64::from(deficit) {
            // Not enough room; everything in the pool bottoms out.
            for &pos in &pool {
                widths[pos] = columns[visible[pos]].minimum_width();
            }
            break;
        }
        let mut taken = 0;
        for (order, &pos) in pool.iter().enumerate() {
            let slack = widths[pos] - columns[visible[pos]].minimum_width();
            let share = if order + 1 == pool.len() {
                deficit - taken
            } else {
                (i64::from(deficit) * i64::from(slack) / slack_total) as i32
            };
            let share = share.min(slack);
            widths[pos] -= share;
            taken += share;
        }
        deficit -= taken;
        if taken == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::column::Column;
    use super::*;

    fn column(id: u32, preferred: i32, minimum: i32) -> Column {
        let mut col = Column::new(id, format!("col-{id}"));
        col.set_preferred_width(preferred);
        col.set_minimum_width(minimum);
        col
    }

    #[test]
    fn test_proportional_shrink_conserves_total() {
        let mut columns = vec![
            column(0, 100, 50),
            column(1, 100, 50),
            column(2, 150, 50),
        ];
        let changed = pack(&mut columns, 300);
        assert_eq!(changed, vec![0, 1, 2]);
        let widths: Vec<i32> = columns.iter().map(|c| c.width().unwrap()).collect();
        assert_eq!(widths.iter().sum::<i32>(), 300);
        assert_eq!(widths, vec![88, 88, 124]);
    }

    #[test]
    fn test_surplus_goes_to_first_visible() {
        let mut columns = vec![column(0, 100, 50), column(1, 100, 50)];
        pack(&mut columns, 260);
        assert_eq!(columns[0].width(), Some(160));
        assert_eq!(columns[1].width(), Some(100));
    }

    #[test]
    fn test_never_shrinks_below_minimum() {
        let mut columns = vec![column(0, 100, 80), column(1, 100, 80)];
        pack(&mut columns, 10);
        assert_eq!(columns[0].width(), Some(80));
        assert_eq!(columns[1].width(), Some(80));
    }

    #[test]
    fn test_non_shrinking_column_keeps_preferred_width() {
        let mut columns = vec![column(0, 100, 40), column(1, 100, 40)];
        columns[0].set_shrinks(false);
        pack(&mut columns, 150);
        assert_eq!(columns[0].width(), Some(100));
        assert_eq!(columns[1].width(), Some(50));
    }

    #[test]
    fn test_hidden_columns_are_ignored() {
        let mut columns = vec![column(0, 100, 50), column(1, 100, 50)];
        columns[0].set_visible(false);
        let changed = pack(&mut columns, 300);
        assert_eq!(changed, vec![1]);
        assert_eq!(columns[0].width(), None);
        assert_eq!(columns[1].width(), Some(300));
    }

    #[test]
    fn test_exact_fit_changes_nothing_twice() {
        let mut columns = vec![column(0, 120, 50), column(1, 180, 50)];
        let first = pack(&mut columns, 300);
        assert_eq!(first, vec![0, 1]);
        let second = pack(&mut columns, 300);
        assert!(second.is_empty());
    }
}
