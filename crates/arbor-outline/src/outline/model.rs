//! The data model underlying an outline view.

use arbor_outline_core::logging::targets;
use tracing::{debug, trace};

use super::column::Column;
use super::error::{OutlineError, Result};
use super::row::{Row, RowArena, RowData, RowId};
use super::selection::Selection;
use super::signals::OutlineSignals;
use super::sorter;

/// Fallback display height for rows whose cached height is unknown.
const DEFAULT_ROW_HEIGHT: i32 = 20;

/// Selection saved across a structural mutation, keyed by row identity
/// so it survives reordering.
struct SavedSelection {
    rows: Vec<RowId>,
    anchor: Option<RowId>,
}

/// A capture of a model's display-level state: the display list, the
/// selection and the column configuration string.
///
/// Row ids stay valid while their records are allocated, so a state can
/// be held across structural edits and restored with
/// [`OutlineModel::restore_state`] as long as no captured row has been
/// destroyed in between.
#[derive(Debug, Clone)]
pub struct ModelState {
    rows: Vec<RowId>,
    selected: Vec<RowId>,
    anchor: Option<RowId>,
    config: String,
}

/// The aggregation root: row tree, columns, selection and lock state.
///
/// Rows live in an arena and are addressed by [`RowId`]. Alongside the
/// tree the model maintains the flat *display list*: top-level rows plus
/// the children of every open container, in pre-order. Display-list
/// membership is what "being in the outline" means; tree links are
/// edited separately ([`insert_child`], [`remove_from_parent`]), which
/// is what lets undo snapshots re-link detached rows.
///
/// Structural mutation while [`locked`] fails with
/// [`OutlineError::LockedModel`] and has no effect. Reads are always
/// permitted.
///
/// [`insert_child`]: OutlineModel::insert_child
/// [`remove_from_parent`]: OutlineModel::remove_from_parent
/// [`locked`]: OutlineModel::is_locked
pub struct OutlineModel {
    rows: RowArena,
    display: Vec<RowId>,
    columns: Vec<Column>,
    selection: Selection,
    locked: bool,
    show_indent: bool,
    indent_width: i32,
    hierarchy_column_id: Option<u32>,
    signals: OutlineSignals,
    notify_selections: bool,
    saved_selection: Option<SavedSelection>,
}

impl Default for OutlineModel {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self {
            rows: RowArena::with_key(),
            display: Vec::new(),
            columns: Vec::new(),
            selection: Selection::new(),
            locked: false,
            show_indent: true,
            indent_width: 0,
            hierarchy_column_id: None,
            signals: OutlineSignals::new(),
            notify_selections: true,
            saved_selection: None,
        }
    }

    /// The model's signals. Observers connect here.
    pub fn signals(&self) -> &OutlineSignals {
        &self.signals
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Appends a column.
    pub fn add_column(&mut self, column: Column) {
        debug_assert!(
            self.column_with_id(column.id()).is_none(),
            "duplicate column id {}",
            column.id()
        );
        self.columns.push(column);
    }

    /// Appends several columns.
    pub fn add_columns(&mut self, columns: impl IntoIterator<Item = Column>) {
        for column in columns {
            self.add_column(column);
        }
    }

    /// Removes the column with the given id.
    pub fn remove_column(&mut self, id: u32) -> Option<Column> {
        let index = self.columns.iter().position(|col| col.id() == id)?;
        Some(self.columns.remove(index))
    }

    /// The columns, in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn reorder_columns(&mut self, order: &[u32]) {
        self.columns.sort_by_key(|col| {
            order
                .iter()
                .position(|&id| id == col.id())
                .unwrap_or(usize::MAX)
        });
    }

    /// Total number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of visible columns.
    pub fn visible_column_count(&self) -> usize {
        self.columns.iter().filter(|col| col.is_visible()).count()
    }

    /// The column with the given user-assigned id.
    pub fn column_with_id(&self, id: u32) -> Option<&Column> {
        self.columns.iter().find(|col| col.id() == id)
    }

    /// Mutable access to the column with the given id.
    pub fn column_with_id_mut(&mut self, id: u32) -> Option<&mut Column> {
        self.columns.iter_mut().find(|col| col.id() == id)
    }

    /// The column at the given position.
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    // =========================================================================
    // Row lifecycle
    // =========================================================================

    /// Allocates a new, detached row and returns its handle.
    ///
    /// The row is not part of the outline until it is attached with
    /// [`add_row`] or [`insert_child`].
    ///
    /// [`add_row`]: OutlineModel::add_row
    /// [`insert_child`]: OutlineModel::insert_child
    pub fn new_row(&mut self, data: Box<dyn RowData>, can_have_children: bool) -> RowId {
        self.rows.insert(Row::new(data, can_have_children))
    }

    /// Frees a detached row and its entire subtree.
    ///
    /// The row must already be out of the display list and unlinked from
    /// any parent; destroying an attached row is a programmer error.
    pub fn destroy_row(&mut self, row: RowId) {
        debug_assert!(
            self.display_index(row).is_none(),
            "destroying a row still in the display list"
        );
        debug_assert!(
            self.rows.get(row).is_none_or(|r| r.parent().is_none()),
            "destroying a row still linked to a parent"
        );
        let mut stack = vec![row];
        while let Some(id) = stack.pop() {
            if let Some(record) = self.rows.remove(id) {
                stack.extend_from_slice(record.children());
            }
        }
    }

    /// Read access to a row record.
    pub fn row(&self, row: RowId) -> Option<&Row> {
        self.rows.get(row)
    }

    /// Mutable access to a row's data provider, without notification.
    ///
    /// Use [`set_row_data`] for edits that views should hear about.
    ///
    /// [`set_row_data`]: OutlineModel::set_row_data
    pub fn row_data_mut(&mut self, row: RowId) -> Option<&mut dyn RowData> {
        self.rows.get_mut(row).map(|record| record.data_mut())
    }

    /// Sets one cell value through the row's data provider and emits
    /// `row_modified`.
    pub fn set_row_data(&mut self, row: RowId, column_id: u32, value: super::row::CellValue) {
        let Some(index) = self.columns.iter().position(|col| col.id() == column_id) else {
            return;
        };
        let column = self.columns[index].clone();
        if let Some(record) = self.rows.get_mut(row) {
            record.data_mut().set_data(&column, value);
            record.invalidate_height();
            self.signals.row_modified.emit((row, column_id));
        }
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    /// The parent of a row, if any.
    pub fn parent_of(&self, row: RowId) -> Option<RowId> {
        self.rows.get(row).and_then(|record| record.parent())
    }

    /// Number of ancestors above the row.
    pub fn depth(&self, row: RowId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(row);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent_of(parent);
        }
        depth
    }

    /// The path from the top-most ancestor down to the row itself.
    pub fn path(&self, row: RowId) -> Vec<RowId> {
        let mut path = vec![row];
        let mut current = self.parent_of(row);
        while let Some(parent) = current {
            path.push(parent);
            current = self.parent_of(parent);
        }
        path.reverse();
        path
    }

    /// Whether `row` is a descendant of `ancestor`.
    pub fn is_descendant_of(&self, row: RowId, ancestor: RowId) -> bool {
        let mut current = self.parent_of(row);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// Links `child` into `parent`'s children at `index` (clamped).
    ///
    /// The child is unlinked from its previous parent first. This edits
    /// the tree only; display membership is managed by [`add_row`] /
    /// [`remove_rows`] / open-state changes.
    ///
    /// [`add_row`]: OutlineModel::add_row
    /// [`remove_rows`]: OutlineModel::remove_rows
    pub fn insert_child(&mut self, parent: RowId, index: usize, child: RowId) -> Result<()> {
        self.ensure_unlocked()?;
        debug_assert!(parent != child, "row cannot be its own child");
        debug_assert!(
            !self.is_descendant_of(parent, child),
            "inserting a row under its own descendant"
        );
        if self.rows.get(parent).is_none_or(|r| !r.can_have_children())
            || self.rows.get(child).is_none()
        {
            return Ok(());
        }
        self.unlink_from_parent(child);
        let record = &mut self.rows[parent];
        let children = record.children_mut().expect("checked container above");
        let index = index.min(children.len());
        children.insert(index, child);
        self.rows[child].set_parent(Some(parent));
        self.invalidate_heights_along_path(parent);
        Ok(())
    }

    /// Appends `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: RowId, child: RowId) -> Result<()> {
        let count = self.rows.get(parent).map_or(0, |r| r.child_count());
        self.insert_child(parent, count, child)
    }

    /// Unlinks a row from its parent, if it has one.
    pub fn remove_from_parent(&mut self, row: RowId) -> Result<()> {
        self.ensure_unlocked()?;
        self.unlink_from_parent(row);
        Ok(())
    }

    fn unlink_from_parent(&mut self, row: RowId) {
        let Some(parent) = self.parent_of(row) else {
            return;
        };
        if let Some(children) = self.rows[parent].children_mut() {
            children.retain(|&id| id != row);
        }
        self.rows[row].set_parent(None);
        self.invalidate_heights_along_path(parent);
    }

    // =========================================================================
    // Display list
    // =========================================================================

    /// Number of rows in the display list.
    pub fn row_count(&self) -> usize {
        self.display.len()
    }

    /// The display list, top to bottom.
    pub fn display_rows(&self) -> &[RowId] {
        &self.display
    }

    /// The row at the given display index.
    pub fn row_at(&self, index: usize) -> Option<RowId> {
        self.display.get(index).copied()
    }

    /// The display index of a row, or `None` when it is not displayed.
    pub fn display_index(&self, row: RowId) -> Option<usize> {
        self.display.iter().position(|&id| id == row)
    }

    /// The top-level rows (those with no parent), in display order.
    pub fn top_level_rows(&self) -> Vec<RowId> {
        self.display
            .iter()
            .copied()
            .filter(|&id| self.parent_of(id).is_none())
            .collect()
    }

    /// Inserts a row into the display list at `index` (clamped).
    ///
    /// With `include_children`, the row's open descendants are inserted
    /// as a unit in pre-order, preserving their relative order. Adding
    /// rows clears the active sort: the new rows have not been placed by
    /// it.
    pub fn add_row(&mut self, index: usize, row: RowId, include_children: bool) -> Result<()> {
        self.ensure_unlocked()?;
        if self.rows.get(row).is_none() {
            return Ok(());
        }
        debug_assert!(
            self.display_index(row).is_none(),
            "row is already in the display list"
        );
        let block = if include_children {
            self.collect_visible(row)
        } else {
            vec![row]
        };
        let index = index.min(self.display.len());
        debug!(
            target: targets::MODEL,
            count = block.len(),
            index,
            "adding rows"
        );
        self.preserve_selection();
        self.display.splice(index..index, block.iter().copied());
        self.restore_selection();
        self.signals.rows_added.emit(block);
        self.invalidate_heights_along_path(row);
        self.clear_sort();
        Ok(())
    }

    /// A row plus, when it is open, its visible descendants in pre-order.
    fn collect_visible(&self, row: RowId) -> Vec<RowId> {
        let mut block = Vec::new();
        self.collect_visible_into(row, &mut block);
        block
    }

    fn collect_visible_into(&self, row: RowId, block: &mut Vec<RowId>) {
        block.push(row);
        if let Some(record) = self.rows.get(row) {
            if record.is_open() {
                for &child in record.children() {
                    self.collect_visible_into(child, block);
                }
            }
        }
    }

    /// Removes rows (and their displayed descendants) from the display
    /// list.
    ///
    /// Observers hear `rows_will_be_removed` while the rows are still
    /// present, then `rows_were_removed` once they are gone; selection
    /// entries for removed rows are dropped. Tree links are untouched;
    /// detach with [`remove_from_parent`] where the structure itself
    /// changes.
    ///
    /// [`remove_from_parent`]: OutlineModel::remove_from_parent
    pub fn remove_rows(&mut self, rows: &[RowId]) -> Result<()> {
        self.ensure_unlocked()?;
        self.remove_rows_internal(rows);
        Ok(())
    }

    fn remove_rows_internal(&mut self, rows: &[RowId]) {
        let mut indexes = std::collections::BTreeSet::new();
        for &row in rows {
            if let Some(start) = self.display_index(row) {
                indexes.insert(start);
                let mut next = start + 1;
                while next < self.display.len()
                    && self.is_descendant_of(self.display[next], row)
                {
                    indexes.insert(next);
                    next += 1;
                }
            }
        }
        if indexes.is_empty() {
            return;
        }
        let removed: Vec<RowId> = indexes.iter().map(|&i| self.display[i]).collect();
        debug!(target: targets::MODEL, count = removed.len(), "removing rows");

        self.preserve_selection();
        self.signals.rows_will_be_removed.emit(removed.clone());
        for &index in indexes.iter().rev() {
            self.display.remove(index);
        }
        self.restore_selection();
        self.signals.rows_were_removed.emit(removed);
    }

    /// Removes every row from the display list.
    pub fn remove_all_rows(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        if self.display.is_empty() {
            return Ok(());
        }
        let removed = self.display.clone();
        self.signals.rows_will_be_removed.emit(removed.clone());
        self.display.clear();
        self.with_selection_change(|selection| {
            let had = !selection.is_empty();
            selection.deselect_all();
            selection.set_size(0);
            had
        });
        self.selection.set_size(0);
        self.signals.rows_were_removed.emit(removed);
        Ok(())
    }

    /// Removes the currently selected rows from the display list.
    pub fn remove_selection(&mut self) -> Result<()> {
        let rows = self.selection_as_list(false);
        self.remove_rows(&rows)
    }

    // =========================================================================
    // Open state
    // =========================================================================

    /// Opens or closes a container row, splicing its children into or
    /// out of the display list. Returns whether the state changed.
    ///
    /// Disclosure is a view-state change, not a tree edit, so it is
    /// permitted on a locked model.
    pub fn set_open(&mut self, row: RowId, open: bool) -> bool {
        let Some(record) = self.rows.get(row) else {
            return false;
        };
        if !record.can_have_children() || record.is_open() == open {
            return false;
        }
        self.rows[row].set_open_flag(open);
        let displayed = self.display_index(row);
        if self.rows[row].has_children() {
            if let Some(index) = displayed {
                if open {
                    let mut block = Vec::new();
                    let children: Vec<RowId> = self.rows[row].children().to_vec();
                    for child in children {
                        self.collect_visible_into(child, &mut block);
                    }
                    self.preserve_selection();
                    self.display.splice(index + 1..index + 1, block.iter().copied());
                    self.restore_selection();
                    self.signals.rows_added.emit(block);
                } else {
                    let children: Vec<RowId> = self.rows[row].children().to_vec();
                    self.remove_rows_internal(&children);
                }
            }
        }
        true
    }

    /// If the first displayed container is open, closes every displayed
    /// container; otherwise opens them all (including containers revealed
    /// by the opening).
    pub fn toggle_row_open_state(&mut self) {
        let mut open = true;
        for &id in &self.display {
            if self.rows[id].can_have_children() {
                open = !self.rows[id].is_open();
                break;
            }
        }
        let mut index = 0;
        while index < self.display.len() {
            let id = self.display[index];
            if self.rows[id].can_have_children() {
                self.set_open(id, open);
            }
            index += 1;
        }
    }

    // =========================================================================
    // Row geometry
    // =========================================================================

    /// The display height used for a row: its cached height, or the
    /// default when unknown.
    pub fn row_height(&self, row: RowId) -> i32 {
        self.rows
            .get(row)
            .and_then(|record| record.height())
            .unwrap_or(DEFAULT_ROW_HEIGHT)
    }

    /// Caches a computed display height for a row.
    pub fn set_row_height(&mut self, row: RowId, height: i32) {
        if let Some(record) = self.rows.get_mut(row) {
            record.set_height(height);
        }
    }

    /// Marks the heights of a row and its ancestors as unknown.
    pub fn invalidate_heights_along_path(&mut self, row: RowId) {
        let mut current = Some(row);
        while let Some(id) = current {
            let Some(record) = self.rows.get_mut(id) else {
                break;
            };
            record.invalidate_height();
            current = record.parent();
        }
    }

    // =========================================================================
    // Indent / hierarchy column
    // =========================================================================

    /// Whether hierarchy indentation is shown.
    pub fn show_indent(&self) -> bool {
        self.show_indent
    }

    /// Sets whether hierarchy indentation is shown.
    pub fn set_show_indent(&mut self, show: bool) {
        self.show_indent = show;
    }

    /// The width used to indent each level of hierarchy.
    pub fn indent_width(&self) -> i32 {
        self.indent_width
    }

    /// Sets the per-level indent width.
    pub fn set_indent_width(&mut self, width: i32) {
        self.indent_width = width;
    }

    /// Designates the column that carries the hierarchy controls, or
    /// `None` to fall back to the first visible column.
    pub fn set_hierarchy_column(&mut self, id: Option<u32>) {
        self.hierarchy_column_id = id;
    }

    /// The column carrying the hierarchy controls.
    pub fn hierarchy_column(&self) -> Option<&Column> {
        if let Some(id) = self.hierarchy_column_id {
            if let Some(column) = self.column_with_id(id) {
                return Some(column);
            }
        }
        self.columns
            .iter()
            .find(|col| col.is_visible())
            .or_else(|| self.columns.first())
    }

    /// The indent of a row within a column: non-zero only for the
    /// hierarchy column when indentation is shown.
    pub fn indent_width_for(&self, row: RowId, column_id: u32) -> i32 {
        let is_hierarchy = self
            .hierarchy_column()
            .is_some_and(|col| col.id() == column_id);
        if self.show_indent && is_hierarchy {
            self.indent_width * (1 + self.depth(row) as i32)
        } else {
            0
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Read access to the selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Runs a selection mutation wrapped in will/did-change signals.
    ///
    /// The mutation runs on a scratch copy first so `selection_will_change`
    /// fires only when something is actually about to change.
    fn with_selection_change(&mut self, mutate: impl Fn(&mut Selection) -> bool) -> bool {
        let mut scratch = self.selection.clone();
        if !mutate(&mut scratch) {
            return false;
        }
        if self.notify_selections {
            self.signals.selection_will_change.emit(());
        }
        self.selection = scratch;
        if self.notify_selections {
            self.signals.selection_did_change.emit(());
        }
        true
    }

    /// Selects every displayed row.
    pub fn select_all(&mut self) {
        self.with_selection_change(|selection| selection.select_all());
    }

    /// Selects the row at a display index.
    pub fn select_index(&mut self, index: usize, add: bool) {
        self.with_selection_change(|selection| selection.select(index, add));
    }

    /// Selects a row.
    pub fn select_row(&mut self, row: RowId, add: bool) {
        if let Some(index) = self.display_index(row) {
            self.select_index(index, add);
        }
    }

    /// Selects an inclusive display-index range.
    pub fn select_range(&mut self, from: usize, to: usize, add: bool) {
        self.with_selection_change(|selection| selection.select_range(from, to, add));
    }

    /// Selects several rows.
    pub fn select_rows(&mut self, rows: &[RowId], add: bool) {
        let indexes: Vec<usize> = rows
            .iter()
            .filter_map(|&row| self.display_index(row))
            .collect();
        self.with_selection_change(|selection| selection.select_many(&indexes, add));
    }

    /// Clears the selection.
    pub fn deselect_all(&mut self) {
        self.with_selection_change(|selection| selection.deselect_all());
    }

    /// Deselects the row at a display index.
    pub fn deselect_index(&mut self, index: usize) {
        self.with_selection_change(|selection| selection.deselect(index));
    }

    /// Deselects a row.
    pub fn deselect_row(&mut self, row: RowId) {
        if let Some(index) = self.display_index(row) {
            self.deselect_index(index);
        }
    }

    /// Whether any row is selected.
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Number of selected rows.
    pub fn selection_count(&self) -> usize {
        self.selection.count()
    }

    /// Whether the row at a display index is selected.
    pub fn is_index_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    /// Whether a row is selected.
    pub fn is_row_selected(&self, row: RowId) -> bool {
        self.display_index(row)
            .is_some_and(|index| self.selection.is_selected(index))
    }

    /// Whether a row is selected directly or through a selected ancestor.
    pub fn is_extended_row_selected(&self, row: RowId) -> bool {
        let mut current = Some(row);
        while let Some(id) = current {
            if self.is_row_selected(id) {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// The first selected row in display order.
    pub fn first_selected_row(&self) -> Option<RowId> {
        self.selection
            .first_selected()
            .and_then(|index| self.row_at(index))
    }

    /// The last selected row in display order.
    pub fn last_selected_row(&self) -> Option<RowId> {
        self.selection
            .last_selected()
            .and_then(|index| self.row_at(index))
    }

    /// The selected rows in display order.
    ///
    /// With `minimal`, rows whose ancestor is also selected are dropped,
    /// leaving only the top of each selected subtree.
    pub fn selection_as_list(&self, minimal: bool) -> Vec<RowId> {
        let mut list = Vec::with_capacity(self.selection.count());
        for index in self.selection.selected_indexes() {
            let Some(row) = self.row_at(index) else {
                continue;
            };
            if minimal {
                let mut ancestor = self.parent_of(row);
                let mut covered = false;
                while let Some(id) = ancestor {
                    if self.is_row_selected(id) {
                        covered = true;
                        break;
                    }
                    ancestor = self.parent_of(id);
                }
                if covered {
                    continue;
                }
            }
            list.push(row);
        }
        list
    }

    /// Saves the selection by row identity and silences selection
    /// notifications until [`restore_selection`] runs.
    ///
    /// [`restore_selection`]: OutlineModel::restore_selection
    fn preserve_selection(&mut self) {
        let anchor = self
            .selection
            .anchor()
            .and_then(|index| self.row_at(index));
        let rows = self.selection_as_list(false);
        self.notify_selections = false;
        self.selection.deselect_all();
        self.saved_selection = Some(SavedSelection { rows, anchor });
    }

    /// Re-applies a saved selection against the current display list.
    /// Rows that are no longer displayed are silently dropped.
    fn restore_selection(&mut self) {
        self.selection.set_size(self.display.len());
        if let Some(saved) = self.saved_selection.take() {
            let indexes: Vec<usize> = saved
                .rows
                .iter()
                .filter_map(|&row| self.display_index(row))
                .collect();
            self.selection.select_many(&indexes, false);
            let anchor = saved.anchor.and_then(|row| self.display_index(row));
            self.selection.set_anchor(anchor);
        }
        self.notify_selections = true;
    }

    // =========================================================================
    // Lock state
    // =========================================================================

    /// Whether the model is locked against structural mutation.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks or unlocks the model, notifying observers on change.
    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            self.signals.locked_state_will_change.emit(locked);
            self.locked = locked;
            self.signals.locked_state_did_change.emit(locked);
            debug!(target: targets::MODEL, locked, "lock state changed");
        }
    }

    pub(crate) fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(OutlineError::LockedModel)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Whether any column carries an active sort sequence.
    pub fn has_active_sort(&self) -> bool {
        self.columns.iter().any(|col| col.sort_sequence().is_some())
    }

    /// Sorts the display list by the active sort columns.
    ///
    /// A no-op when no column has a sort sequence (the original order is
    /// the sort order). Selection survives by row identity.
    pub fn sort(&mut self) {
        self.sort_internal(false);
    }

    pub(crate) fn sort_internal(&mut self, restoring: bool) {
        if !self.has_active_sort() {
            return;
        }
        trace!(target: targets::SORT, rows = self.display.len(), "sorting");
        self.preserve_selection();
        sorter::sort_display(&self.rows, &self.columns, &mut self.display);
        self.restore_selection();
        self.signals.sorted.emit(restoring);
    }

    /// Sorts like [`sort`], and additionally rewrites every container's
    /// stored child list (recursively, including closed containers) so
    /// the underlying tree order matches the display order, for callers
    /// that serialize the tree.
    ///
    /// [`sort`]: OutlineModel::sort
    pub fn sort_children_in_place(&mut self) {
        if !self.has_active_sort() {
            return;
        }
        self.preserve_selection();
        sorter::sort_display(&self.rows, &self.columns, &mut self.display);
        sorter::sort_children(&mut self.rows, &self.columns);
        // Rebuild the display from the (now sorted) tree so the two
        // orders cannot drift apart.
        let top_level = self.top_level_rows();
        let mut display = Vec::with_capacity(self.display.len());
        for row in top_level {
            self.collect_visible_into(row, &mut display);
        }
        self.display = display;
        self.restore_selection();
        self.signals.sorted.emit(false);
    }

    /// Clears the sort criteria on all columns, notifying observers if
    /// anything was cleared.
    pub fn clear_sort(&mut self) {
        if self.clear_sort_internal() {
            self.signals.sort_cleared.emit(());
        }
    }

    pub(crate) fn clear_sort_internal(&mut self) -> bool {
        let mut cleared = false;
        for column in &mut self.columns {
            if column.sort_sequence().is_some() {
                let ascending = column.is_sort_ascending();
                column.set_sort_criteria(None, ascending);
                cleared = true;
            }
        }
        cleared
    }

    /// Makes a column part of the active sort and re-sorts.
    ///
    /// With `add == false` the column becomes the primary and only sort
    /// column; with `add == true` it is appended after the current sort
    /// columns (or, if already active, only its direction is updated).
    /// Returns `false` when the column id is unknown.
    pub fn set_sort_column(&mut self, column_id: u32, ascending: bool, add: bool) -> bool {
        if self.column_with_id(column_id).is_none() {
            return false;
        }
        if add {
            let existing = self
                .column_with_id(column_id)
                .and_then(|col| col.sort_sequence());
            let sequence = match existing {
                Some(seq) => seq,
                None => self
                    .columns
                    .iter()
                    .filter(|col| col.sort_sequence().is_some())
                    .count() as u32,
            };
            let column = self.column_with_id_mut(column_id).expect("checked above");
            column.set_sort_criteria(Some(sequence), ascending);
        } else {
            self.clear_sort_internal();
            let column = self.column_with_id_mut(column_id).expect("checked above");
            column.set_sort_criteria(Some(0), ascending);
        }
        self.sort_internal(false);
        true
    }

    // =========================================================================
    // Column packing
    // =========================================================================

    /// Distributes `available` pixels across the visible columns and
    /// returns the ids of columns whose width changed.
    ///
    /// See the packing rules on [`pack`](super::pack).
    pub fn pack_columns(&mut self, available: i32) -> Vec<u32> {
        super::pack::pack(&mut self.columns, available)
    }

    // =========================================================================
    // Undo plumbing
    // =========================================================================

    pub(crate) fn emit_undo_will_happen(&self) {
        self.signals.undo_will_happen.emit(());
    }

    pub(crate) fn emit_undo_did_happen(&self) {
        self.signals.undo_did_happen.emit(());
    }

    /// Restores a row's structural shape from an undo snapshot: parent
    /// identity, open flag and direct children. Children-list membership
    /// is kept consistent on both sides of every changed link, and the
    /// display list is re-spliced so every displayed subtree matches the
    /// restored parent/open state. The restore is shallow otherwise;
    /// related rows carry their own undo entries, and rows with no
    /// displayed ancestor are put back by [`restore_state`].
    ///
    /// [`restore_state`]: OutlineModel::restore_state
    pub(crate) fn apply_snapshot_links(
        &mut self,
        row: RowId,
        parent: Option<RowId>,
        open: bool,
        children: &[RowId],
    ) {
        let previous_parent = self.parent_of(row);
        if previous_parent != parent {
            self.remove_display_block(row);
            self.unlink_from_parent(row);
            if let Some(new_parent) = parent {
                if let Some(list) = self
                    .rows
                    .get_mut(new_parent)
                    .and_then(|record| record.children_mut())
                {
                    list.push(row);
                }
                self.rows[row].set_parent(Some(new_parent));
            }
        }
        self.rows[row].set_open_flag(open);
        if self.rows[row].can_have_children() {
            let dropped: Vec<RowId> = self.rows[row]
                .children()
                .iter()
                .copied()
                .filter(|id| !children.contains(id))
                .collect();
            for id in dropped {
                // While still linked, so the block scan finds its rows.
                self.remove_display_block(id);
                self.rows[id].set_parent(None);
            }
            for &child in children {
                if self.parent_of(child) != Some(row) {
                    self.remove_display_block(child);
                    self.unlink_from_parent(child);
                    self.rows[child].set_parent(Some(row));
                }
            }
            if let Some(list) = self.rows[row].children_mut() {
                list.clear();
                list.extend_from_slice(children);
            }
        }
        if let Some(previous) = previous_parent.filter(|&p| parent != Some(p)) {
            self.refresh_display_subtree(previous);
        }
        self.refresh_display_subtree(row);
        self.invalidate_heights_along_path(row);
    }

    /// Removes a row and its displayed descendants from the display
    /// list, without signals. Selection survives by identity.
    fn remove_display_block(&mut self, row: RowId) {
        let Some(start) = self.display_index(row) else {
            return;
        };
        let mut end = start + 1;
        while end < self.display.len() && self.is_descendant_of(self.display[end], row) {
            end += 1;
        }
        self.preserve_selection();
        self.display.drain(start..end);
        self.restore_selection();
    }

    /// Re-splices the displayed block under the nearest displayed
    /// ancestor of `row` (or `row` itself) so it matches the current
    /// tree links and open flags. A no-op when nothing in the path is
    /// displayed.
    fn refresh_display_subtree(&mut self, row: RowId) {
        let mut anchor = Some(row);
        let mut index = None;
        while let Some(id) = anchor {
            if let Some(found) = self.display_index(id) {
                index = Some(found);
                break;
            }
            anchor = self.rows.get(id).and_then(|record| record.parent());
        }
        let (Some(anchor), Some(index)) = (anchor, index) else {
            return;
        };
        let mut end = index + 1;
        while end < self.display.len() && self.is_descendant_of(self.display[end], anchor) {
            end += 1;
        }
        let mut block = Vec::new();
        if self.rows[anchor].is_open() {
            let children: Vec<RowId> = self.rows[anchor].children().to_vec();
            for child in children {
                self.collect_visible_into(child, &mut block);
            }
        }
        if self.display[index + 1..end] == block[..] {
            return;
        }
        self.preserve_selection();
        self.display.splice(index + 1..end, block.iter().copied());
        self.restore_selection();
    }

    /// Captures the display-level state: the display list, the selection
    /// and the column configuration.
    ///
    /// Tree-level actions (bulk delete, drags that move top-level rows)
    /// store one of these alongside their per-row undos, because a row
    /// snapshot can only re-splice display membership under a displayed
    /// ancestor; top-level rows have none.
    pub fn capture_state(&self) -> ModelState {
        ModelState {
            rows: self.display.clone(),
            selected: self.selection_as_list(false),
            anchor: self
                .selection
                .anchor()
                .and_then(|index| self.row_at(index)),
            config: self.config(),
        }
    }

    /// Restores a state captured by [`capture_state`].
    ///
    /// All-or-nothing: every referenced row is validated and the column
    /// configuration applied (itself rejected as a unit) before the
    /// display list and selection are replaced. Fails with
    /// `SnapshotCorrupt` when a captured row has since been destroyed.
    ///
    /// [`capture_state`]: OutlineModel::capture_state
    pub fn restore_state(&mut self, state: &ModelState) -> Result<()> {
        for &row in &state.rows {
            if self.rows.get(row).is_none() {
                return Err(OutlineError::snapshot_corrupt(
                    "state references a destroyed row",
                ));
            }
        }
        self.apply_config(&state.config)?;
        self.display = state.rows.clone();
        self.selection.set_size(self.display.len());
        self.selection.deselect_all();
        let indexes: Vec<usize> = state
            .selected
            .iter()
            .filter_map(|&row| self.display_index(row))
            .collect();
        self.selection.select_many(&indexes, false);
        let anchor = state.anchor.and_then(|row| self.display_index(row));
        self.selection.set_anchor(anchor);
        debug!(target: targets::MODEL, rows = self.display.len(), "restored model state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::support::{sample_model, SampleRow, COL_NAME};
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_add_row_with_children_inserts_block() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child_a = model.new_row(SampleRow::boxed("a", 1), false);
        let child_b = model.new_row(SampleRow::boxed("b", 2), false);
        model.add_child(parent, child_a).unwrap();
        model.add_child(parent, child_b).unwrap();
        model.set_open(parent, true);

        model.add_row(0, parent, true).unwrap();
        assert_eq!(model.display_rows(), &[parent, child_a, child_b]);
        assert_eq!(model.depth(child_a), 1);
        assert_eq!(model.parent_of(child_b), Some(parent));
    }

    #[test]
    fn test_remove_rows_takes_descendants_and_prunes_selection() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 1), false);
        let other = model.new_row(SampleRow::boxed("other", 2), false);
        model.add_child(parent, child).unwrap();
        model.set_open(parent, true);
        model.add_row(0, parent, true).unwrap();
        model.add_row(2, other, false).unwrap();
        model.select_row(child, false);
        assert!(model.has_selection());

        model.remove_rows(&[parent]).unwrap();
        assert_eq!(model.display_rows(), &[other]);
        assert!(!model.has_selection());
        // Tree links survive display removal.
        assert_eq!(model.parent_of(child), Some(parent));
    }

    #[test]
    fn test_removal_notifications_bracket_the_removal() {
        let mut model = sample_model();
        let row = model.new_row(SampleRow::boxed("x", 0), false);
        model.add_row(0, row, false).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = log.clone();
        model
            .signals()
            .rows_will_be_removed
            .connect(move |rows| l1.lock().push(("will", rows.len())));
        let l2 = log.clone();
        model
            .signals()
            .rows_were_removed
            .connect(move |rows| l2.lock().push(("were", rows.len())));

        model.remove_rows(&[row]).unwrap();
        assert_eq!(*log.lock(), vec![("will", 1), ("were", 1)]);
    }

    #[test]
    fn test_locked_model_rejects_structural_mutation() {
        let mut model = sample_model();
        let row = model.new_row(SampleRow::boxed("x", 0), false);
        model.add_row(0, row, false).unwrap();

        model.set_locked(true);
        assert_eq!(
            model.add_row(1, row, false),
            Err(OutlineError::LockedModel)
        );
        assert_eq!(model.remove_rows(&[row]), Err(OutlineError::LockedModel));
        // Reads still work.
        assert_eq!(model.row_count(), 1);
        assert!(model.row(row).is_some());

        model.set_locked(false);
        model.remove_rows(&[row]).unwrap();
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_open_close_splices_children() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 1), false);
        model.add_child(parent, child).unwrap();
        model.add_row(0, parent, false).unwrap();
        assert_eq!(model.row_count(), 1);

        assert!(model.set_open(parent, true));
        assert_eq!(model.display_rows(), &[parent, child]);

        assert!(model.set_open(parent, false));
        assert_eq!(model.display_rows(), &[parent]);
        assert!(!model.set_open(parent, false));
    }

    #[test]
    fn test_toggle_row_open_state_opens_nested() {
        let mut model = sample_model();
        let outer = model.new_row(SampleRow::boxed("outer", 0), true);
        let inner = model.new_row(SampleRow::boxed("inner", 1), true);
        let leaf = model.new_row(SampleRow::boxed("leaf", 2), false);
        model.add_child(outer, inner).unwrap();
        model.add_child(inner, leaf).unwrap();
        model.add_row(0, outer, false).unwrap();

        model.toggle_row_open_state();
        assert_eq!(model.display_rows(), &[outer, inner, leaf]);

        model.toggle_row_open_state();
        assert_eq!(model.display_rows(), &[outer]);
    }

    #[test]
    fn test_selection_signals_only_on_change() {
        let mut model = sample_model();
        let row = model.new_row(SampleRow::boxed("x", 0), false);
        model.add_row(0, row, false).unwrap();

        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        model
            .signals()
            .selection_will_change
            .connect(move |_| *c.lock() += 1);

        model.select_row(row, false);
        model.select_row(row, false); // already selected, no signal
        model.deselect_all();
        model.deselect_all(); // already empty, no signal
        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_selection_survives_sort_by_identity() {
        let mut model = sample_model();
        let b = model.new_row(SampleRow::boxed("b", 1), false);
        let a = model.new_row(SampleRow::boxed("a", 2), false);
        model.add_row(0, b, false).unwrap();
        model.add_row(1, a, false).unwrap();
        model.select_row(b, false);

        model.set_sort_column(COL_NAME, true, false);
        assert_eq!(model.display_rows(), &[a, b]);
        assert!(model.is_row_selected(b));
        assert!(!model.is_row_selected(a));
    }

    #[test]
    fn test_selection_as_list_minimal() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 1), false);
        model.add_child(parent, child).unwrap();
        model.set_open(parent, true);
        model.add_row(0, parent, true).unwrap();

        model.select_row(parent, false);
        model.select_row(child, true);
        assert_eq!(model.selection_as_list(false), vec![parent, child]);
        assert_eq!(model.selection_as_list(true), vec![parent]);
    }

    #[test]
    fn test_destroy_row_frees_subtree() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 1), false);
        model.add_child(parent, child).unwrap();
        model.add_row(0, parent, false).unwrap();

        model.remove_rows(&[parent]).unwrap();
        model.remove_from_parent(parent).unwrap();
        model.destroy_row(parent);
        assert!(model.row(parent).is_none());
        assert!(model.row(child).is_none());
    }

    #[test]
    fn test_restore_state_brings_back_deleted_top_level_rows() {
        let mut model = sample_model();
        let a = model.new_row(SampleRow::boxed("a", 1), false);
        let b = model.new_row(SampleRow::boxed("b", 2), false);
        model.add_row(0, a, false).unwrap();
        model.add_row(1, b, false).unwrap();
        model.set_sort_column(COL_NAME, true, false);
        model.select_row(b, false);

        let state = model.capture_state();
        model.remove_rows(&[a, b]).unwrap();
        assert_eq!(model.row_count(), 0);

        model.restore_state(&state).unwrap();
        assert_eq!(model.display_rows(), &[a, b]);
        assert!(model.is_row_selected(b));
        assert!(!model.is_row_selected(a));
        assert_eq!(
            model.column_with_id(COL_NAME).unwrap().sort_sequence(),
            Some(0)
        );
    }

    #[test]
    fn test_restore_state_rejects_destroyed_rows() {
        let mut model = sample_model();
        let row = model.new_row(SampleRow::boxed("x", 0), false);
        model.add_row(0, row, false).unwrap();

        let state = model.capture_state();
        model.remove_rows(&[row]).unwrap();
        model.destroy_row(row);

        assert!(matches!(
            model.restore_state(&state),
            Err(OutlineError::SnapshotCorrupt { .. })
        ));
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_extended_selection_covers_descendants() {
        let mut model = sample_model();
        let parent = model.new_row(SampleRow::boxed("parent", 0), true);
        let child = model.new_row(SampleRow::boxed("child", 1), false);
        model.add_child(parent, child).unwrap();
        model.set_open(parent, true);
        model.add_row(0, parent, true).unwrap();

        model.select_row(parent, false);
        assert!(model.is_extended_row_selected(child));
        assert!(!model.is_row_selected(child));
    }
}
