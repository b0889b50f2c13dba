//! Logging facilities for Arbor Outline.
//!
//! The crates in this workspace instrument themselves with the `tracing`
//! crate. Install a subscriber in the host application to see output:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem,
/// e.g. `RUST_LOG=arbor_outline::model=debug`.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "arbor_outline_core";
    /// Model mutation target.
    pub const MODEL: &str = "arbor_outline::model";
    /// Sorting target.
    pub const SORT: &str = "arbor_outline::sort";
    /// Column width allocation target.
    pub const PACK: &str = "arbor_outline::pack";
    /// Drop target resolution target.
    pub const DROP: &str = "arbor_outline::drop";
    /// Undo/redo snapshot target.
    pub const UNDO: &str = "arbor_outline::undo";
}
