//! Core plumbing for Arbor Outline.
//!
//! This crate holds the pieces of the outline model that are not specific
//! to rows or columns: the signal/slot mechanism views use to observe a
//! model, and the tracing targets used for log filtering.
//!
//! # Example
//!
//! ```
//! use arbor_outline_core::Signal;
//!
//! let changed = Signal::<String>::new();
//! let id = changed.connect(|text| {
//!     println!("changed to {text}");
//! });
//! changed.emit("hello".to_string());
//! changed.disconnect(id);
//! ```

pub mod logging;
mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};
