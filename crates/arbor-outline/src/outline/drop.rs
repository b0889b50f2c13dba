//! Drop-target resolution for interactive row reordering.
//!
//! [`resolve_drop`] is a pure read of model state plus a probe position,
//! so callers can re-run it on every pointer move without accumulating
//! any state. Row bands stack vertically in display order using each
//! row's display height.
//!
//! [`resolve_drop`]: OutlineModel::resolve_drop

use arbor_outline_core::logging::targets;
use tracing::trace;

use super::model::OutlineModel;
use super::row::RowId;

/// A structurally valid insertion point produced by drop resolution.
///
/// `parent == None` targets the top level; `index` is the insertion
/// position within the parent's children (or among the top-level rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    /// The container to insert into, or `None` for the top level.
    pub parent: Option<RowId>,
    /// The child insertion index within the parent.
    pub index: usize,
}

impl OutlineModel {
    /// Resolves the drop target for a probe at `(x, y)` while dragging
    /// `drag_rows`.
    ///
    /// The upper half of a row's band inserts before that row at its
    /// parent's level; the lower half inserts after it, except that the
    /// lower half of an open container, with `x` past its indent marker,
    /// inserts inside the container at index 0. A band belonging to the
    /// dragged rows or their descendants snaps to the gap above the
    /// dragged block instead, so the resolved target's parent chain
    /// never contains a dragged row and a row can never be dropped into
    /// itself. Returns `None` when no valid target exists at this
    /// position; that is a routine outcome during a drag, not an error.
    pub fn resolve_drop(&self, x: i32, y: i32, drag_rows: &[RowId]) -> Option<DropTarget> {
        if drag_rows.iter().any(|&row| self.row(row).is_none()) {
            return None;
        }
        if self.row_count() == 0 {
            return Some(DropTarget {
                parent: None,
                index: 0,
            });
        }

        let mut top = 0;
        for &row in self.display_rows() {
            let bottom = top + self.row_height(row);
            if y < bottom {
                let target = self.resolve_over_band(row, x, y, top, bottom, drag_rows);
                trace!(target: targets::DROP, x, y, valid = target.is_some(), "resolved drop");
                return target;
            }
            top = bottom;
        }
        self.resolve_past_last(drag_rows)
    }

    fn resolve_over_band(
        &self,
        row: RowId,
        x: i32,
        y: i32,
        band_top: i32,
        band_bottom: i32,
        drag_rows: &[RowId],
    ) -> Option<DropTarget> {
        if self.is_dragged(row, drag_rows) {
            // The band itself cannot accept the drop; snap to the gap
            // above it when that level is outside the dragged block.
            let level_valid = self
                .parent_of(row)
                .is_none_or(|parent| !self.is_dragged(parent, drag_rows));
            return level_valid.then(|| self.sibling_target(row, 0));
        }
        let record = self.row(row)?;
        let upper_half = y < band_top + (band_bottom - band_top) / 2;
        if upper_half {
            return Some(self.sibling_target(row, 0));
        }
        // The row's indent marker, honoring the hierarchy column and
        // the show-indent setting.
        let marker = self
            .hierarchy_column()
            .map(|col| col.id())
            .map_or(0, |id| self.indent_width_for(row, id));
        if record.can_have_children() && record.is_open() && x >= marker {
            return Some(DropTarget {
                parent: Some(row),
                index: 0,
            });
        }
        Some(self.sibling_target(row, 1))
    }

    /// A target before (`offset == 0`) or after (`offset == 1`) `row`,
    /// at `row`'s own level.
    fn sibling_target(&self, row: RowId, offset: usize) -> DropTarget {
        match self.parent_of(row) {
            Some(parent) => {
                let index = self
                    .row(parent)
                    .and_then(|record| record.index_of_child(row))
                    .unwrap_or(0);
                DropTarget {
                    parent: Some(parent),
                    index: index + offset,
                }
            }
            None => {
                let top_level = self.top_level_rows();
                let index = top_level
                    .iter()
                    .position(|&id| id == row)
                    .unwrap_or(top_level.len());
                DropTarget {
                    parent: None,
                    index: index + offset,
                }
            }
        }
    }

    /// A probe below every band appends after the last top-level row, or
    /// inside it when it is an open container.
    fn resolve_past_last(&self, drag_rows: &[RowId]) -> Option<DropTarget> {
        let top_level = self.top_level_rows();
        let Some(&last) = top_level.last() else {
            return Some(DropTarget {
                parent: None,
                index: 0,
            });
        };
        if self.is_dragged(last, drag_rows) {
            return None;
        }
        let record = self.row(last)?;
        if record.can_have_children() && record.is_open() {
            return Some(DropTarget {
                parent: Some(last),
                index: record.child_count(),
            });
        }
        Some(DropTarget {
            parent: None,
            index: top_level.len(),
        })
    }

    fn is_dragged(&self, row: RowId, drag_rows: &[RowId]) -> bool {
        drag_rows.contains(&row)
            || drag_rows
                .iter()
                .any(|&dragged| self.is_descendant_of(row, dragged))
    }
}

#[cfg(test)]
mod tests {
    use super::super::support::{sample_model, SampleRow};
    use super::*;

    #[test]
    fn test_empty_model_targets_root() {
        let model = sample_model();
        assert_eq!(
            model.resolve_drop(0, 50, &[]),
            Some(DropTarget {
                parent: None,
                index: 0
            })
        );
    }

    #[test]
    fn test_band_halves() {
        let mut model = sample_model();
        let first = model.new_row(SampleRow::boxed("first", 0), false);
        let second = model.new_row(SampleRow::boxed("second", 0), false);
        model.add_row(0, first, false).unwrap();
        model.add_row(1, second, false).unwrap();
        model.set_row_height(first, 20);
        model.set_row_height(second, 20);

        // Upper half of the first band inserts before it.
        assert_eq!(
            model.resolve_drop(0, 4, &[]),
            Some(DropTarget {
                parent: None,
                index: 0
            })
        );
        // Lower half of the first band inserts after it.
        assert_eq!(
            model.resolve_drop(0, 15, &[]),
            Some(DropTarget {
                parent: None,
                index: 1
            })
        );
        // Lower half of the second band inserts after it.
        assert_eq!(
            model.resolve_drop(0, 35, &[]),
            Some(DropTarget {
                parent: None,
                index: 2
            })
        );
    }

    #[test]
    fn test_lower_half_of_open_container_targets_inside() {
        let mut model = sample_model();
        let container = model.new_row(SampleRow::boxed("container", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 0), false);
        model.add_child(container, child).unwrap();
        model.set_open(container, true);
        model.add_row(0, container, true).unwrap();
        model.set_row_height(container, 20);
        model.set_row_height(child, 20);
        model.set_indent_width(10);

        // Past the indent marker: inside the container at the front.
        assert_eq!(
            model.resolve_drop(50, 15, &[]),
            Some(DropTarget {
                parent: Some(container),
                index: 0
            })
        );
        // Left of the indent marker: after the container at top level.
        assert_eq!(
            model.resolve_drop(0, 15, &[]),
            Some(DropTarget {
                parent: None,
                index: 1
            })
        );
    }

    #[test]
    fn test_sibling_target_inside_parent() {
        let mut model = sample_model();
        let container = model.new_row(SampleRow::boxed("container", 0), true);
        let first = model.new_row(SampleRow::boxed("first", 0), false);
        let second = model.new_row(SampleRow::boxed("second", 0), false);
        model.add_child(container, first).unwrap();
        model.add_child(container, second).unwrap();
        model.set_open(container, true);
        model.add_row(0, container, true).unwrap();
        for &row in &[container, first, second] {
            model.set_row_height(row, 20);
        }

        // Upper half of the second child: before it within the container.
        assert_eq!(
            model.resolve_drop(0, 42, &[]),
            Some(DropTarget {
                parent: Some(container),
                index: 1
            })
        );
    }

    #[test]
    fn test_dragged_rows_and_descendants_are_not_targets() {
        let mut model = sample_model();
        let container = model.new_row(SampleRow::boxed("container", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 0), false);
        let other = model.new_row(SampleRow::boxed("other", 0), false);
        model.add_child(container, child).unwrap();
        model.set_open(container, true);
        model.add_row(0, container, true).unwrap();
        model.add_row(2, other, false).unwrap();
        for &row in &[container, child, other] {
            model.set_row_height(row, 20);
        }

        let drag = [container];
        // Over the dragged container: snaps to the gap above it.
        assert_eq!(
            model.resolve_drop(0, 10, &drag),
            Some(DropTarget {
                parent: None,
                index: 0
            })
        );
        // Over its child: the whole level is inside the dragged block.
        assert_eq!(model.resolve_drop(0, 30, &drag), None);
        // The unrelated row is still a target.
        assert!(model.resolve_drop(0, 50, &drag).is_some());
    }

    #[test]
    fn test_hidden_indent_drops_inside_container_at_any_x() {
        let mut model = sample_model();
        let container = model.new_row(SampleRow::boxed("container", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 0), false);
        model.add_child(container, child).unwrap();
        model.set_open(container, true);
        model.add_row(0, container, true).unwrap();
        model.set_row_height(container, 20);
        model.set_row_height(child, 20);
        model.set_indent_width(10);
        model.set_show_indent(false);

        // With indentation hidden there is no marker, so the lower half
        // of the open container targets inside it even at x = 0.
        assert_eq!(
            model.resolve_drop(0, 15, &[]),
            Some(DropTarget {
                parent: Some(container),
                index: 0
            })
        );
    }

    #[test]
    fn test_past_last_row() {
        let mut model = sample_model();
        let leaf = model.new_row(SampleRow::boxed("leaf", 0), false);
        model.add_row(0, leaf, false).unwrap();
        model.set_row_height(leaf, 20);
        assert_eq!(
            model.resolve_drop(0, 500, &[]),
            Some(DropTarget {
                parent: None,
                index: 1
            })
        );

        let container = model.new_row(SampleRow::boxed("container", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 0), false);
        model.add_child(container, child).unwrap();
        model.set_open(container, true);
        model.add_row(1, container, true).unwrap();
        assert_eq!(
            model.resolve_drop(0, 500, &[]),
            Some(DropTarget {
                parent: Some(container),
                index: 1
            })
        );
    }

    #[test]
    fn test_unknown_drag_row_yields_no_target() {
        let mut model = sample_model();
        let row = model.new_row(SampleRow::boxed("x", 0), false);
        model.add_row(0, row, false).unwrap();
        let stale = {
            let doomed = model.new_row(SampleRow::boxed("gone", 0), false);
            model.destroy_row(doomed);
            doomed
        };
        assert_eq!(model.resolve_drop(0, 5, &[stale]), None);
    }
}
