//! Change notifications emitted by an outline model.

use arbor_outline_core::Signal;

use super::row::RowId;

/// Collection of signals emitted by an [`OutlineModel`].
///
/// Views connect to these to stay synchronized with the model. Removal
/// is bracketed: `rows_will_be_removed` fires while the rows are still
/// present, `rows_were_removed` after they are gone. The same pattern
/// applies to lock, selection and undo notifications.
///
/// [`OutlineModel`]: super::OutlineModel
pub struct OutlineSignals {
    /// Emitted after rows enter the display list.
    pub rows_added: Signal<Vec<RowId>>,

    /// Emitted just before rows leave the display list.
    pub rows_will_be_removed: Signal<Vec<RowId>>,

    /// Emitted after rows have left the display list.
    pub rows_were_removed: Signal<Vec<RowId>>,

    /// Emitted when a row's content changed. Args: (row, column id).
    pub row_modified: Signal<(RowId, u32)>,

    /// Emitted when the active sort criteria were cleared.
    pub sort_cleared: Signal<()>,

    /// Emitted after the model was sorted. The flag is `true` when the
    /// sort ran as part of restoring a configuration or undo state.
    pub sorted: Signal<bool>,

    /// Emitted before the locked state changes. Arg: the new state.
    pub locked_state_will_change: Signal<bool>,

    /// Emitted after the locked state changed. Arg: the new state.
    pub locked_state_did_change: Signal<bool>,

    /// Emitted before the selection changes.
    pub selection_will_change: Signal<()>,

    /// Emitted after the selection changed.
    pub selection_did_change: Signal<()>,

    /// Emitted before an undo or redo is applied to the model.
    pub undo_will_happen: Signal<()>,

    /// Emitted after an undo or redo was applied to the model.
    pub undo_did_happen: Signal<()>,
}

impl Default for OutlineSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineSignals {
    /// Creates a new set of outline signals.
    pub fn new() -> Self {
        Self {
            rows_added: Signal::new(),
            rows_will_be_removed: Signal::new(),
            rows_were_removed: Signal::new(),
            row_modified: Signal::new(),
            sort_cleared: Signal::new(),
            sorted: Signal::new(),
            locked_state_will_change: Signal::new(),
            locked_state_did_change: Signal::new(),
            selection_will_change: Signal::new(),
            selection_did_change: Signal::new(),
            undo_will_happen: Signal::new(),
            undo_did_happen: Signal::new(),
        }
    }
}
