//! Arbor Outline - a hierarchical, sortable, column-based table model.
//!
//! An *outline* is a tree-shaped table: rows nest under container rows,
//! columns are ordered, resizable and sortable. This crate is the model
//! layer only: it owns the row tree, the column list, selection, sorting,
//! column-width allocation, drop-target resolution for drag reordering,
//! and a snapshot-based undo system. Painting and event dispatch belong
//! to whatever view sits on top.
//!
//! # Example
//!
//! ```
//! use arbor_outline::{CellValue, Column, OutlineModel, RowData};
//!
//! struct Item {
//!     name: String,
//! }
//!
//! impl RowData for Item {
//!     fn data(&self, _column: &Column) -> CellValue {
//!         CellValue::Text(self.name.clone())
//!     }
//!     fn set_data(&mut self, _column: &Column, value: CellValue) {
//!         if let CellValue::Text(text) = value {
//!             self.name = text;
//!         }
//!     }
//!     fn encode_content(&self, buf: &mut Vec<u8>) {
//!         buf.extend_from_slice(self.name.as_bytes());
//!     }
//!     fn restore_content(&mut self, bytes: &[u8]) -> arbor_outline::Result<()> {
//!         self.name = String::from_utf8_lossy(bytes).into_owned();
//!         Ok(())
//!     }
//! }
//!
//! let mut model = OutlineModel::new();
//! model.add_column(Column::new(0, "Name"));
//! let row = model.new_row(Box::new(Item { name: "alpha".into() }), false);
//! model.add_row(model.row_count(), row, false).unwrap();
//! assert_eq!(model.row_count(), 1);
//! ```

pub mod outline;

pub use arbor_outline_core::{ConnectionGuard, ConnectionId, Signal, logging};
pub use outline::{
    CellValue, Column, DropTarget, ModelState, MultipleRowUndo, OutlineError, OutlineModel,
    OutlineSignals, Result, Row, RowData, RowId, RowSnapshot, RowUndo, Selection, CONFIG_VERSION,
};
