//! The outline model.
//!
//! # Core Types
//!
//! - [`OutlineModel`]: the aggregation root holding the row tree,
//!   columns, selection and lock state
//! - [`Row`] / [`RowId`]: a tree node and its stable arena handle
//! - [`RowData`]: the capability a host implements to supply cell values
//! - [`Column`]: an ordered, named slot with width and sort criteria
//! - [`OutlineSignals`]: change notifications consumed by views
//! - [`RowUndo`] / [`MultipleRowUndo`]: snapshot-based undo/redo
//!
//! # Display order
//!
//! The model keeps a flat *display list* alongside the tree: every
//! top-level row, plus the children of each *open* container, interleaved
//! in pre-order. Sorting, selection and drop resolution all operate on
//! this list, which is exactly what a view paints top to bottom.
//!
//! # Example
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────┐
//! │ OutlineModel │────>│ OutlineSignals │────>│   View   │
//! └──────────────┘     └────────────────┘     └──────────┘
//!        │ owns
//!        ▼
//!   rows (arena) + columns + selection
//! ```

mod column;
mod config;
mod drop;
mod error;
mod model;
mod pack;
mod row;
mod selection;
mod signals;
mod sorter;
mod undo;

#[cfg(test)]
pub(crate) mod support;

pub use column::Column;
pub use config::CONFIG_VERSION;
pub use drop::DropTarget;
pub use error::{OutlineError, Result};
pub use model::{ModelState, OutlineModel};
pub use row::{CellValue, Row, RowData, RowId};
pub use selection::Selection;
pub use signals::OutlineSignals;
pub use undo::{MultipleRowUndo, RowSnapshot, RowUndo};
