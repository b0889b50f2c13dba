//! Error types for the outline model.

/// Result type alias for outline operations.
pub type Result<T> = std::result::Result<T, OutlineError>;

/// Errors that can occur while operating on an outline model.
///
/// All variants are expected runtime outcomes and leave the model in its
/// pre-operation state. Structural-invariant violations (cycles, dangling
/// parent links) are programmer errors and are asserted, not returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutlineError {
    /// A structural mutation was attempted while the model is locked.
    #[error("model is locked against structural changes")]
    LockedModel,

    /// A configuration string references a column id the model does not have.
    #[error("configuration references unknown column id {id}")]
    InvalidColumnReference { id: u32 },

    /// A configuration string could not be parsed or carries an
    /// unsupported version.
    #[error("malformed configuration: {message}")]
    MalformedConfig { message: String },

    /// An undo snapshot failed to deserialize.
    #[error("undo snapshot is corrupt: {message}")]
    SnapshotCorrupt { message: String },
}

impl OutlineError {
    /// Creates a malformed-config error.
    pub fn malformed_config(message: impl Into<String>) -> Self {
        Self::MalformedConfig {
            message: message.into(),
        }
    }

    /// Creates a snapshot-corruption error.
    pub fn snapshot_corrupt(message: impl Into<String>) -> Self {
        Self::SnapshotCorrupt {
            message: message.into(),
        }
    }
}
