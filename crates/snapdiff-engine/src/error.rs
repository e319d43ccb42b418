//! Error types for the diff engine.

/// Errors that can occur while comparing two objects.
///
/// Introspection failures are fatal: the comparison aborts at the first
/// unreadable attribute and no partial diff list is returned.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A state slot resolved from the metadata table could not be read.
    #[error("failed to read field {name:?} during comparison")]
    FieldRead { name: String },

    /// An accessor resolved from the metadata table could not be invoked.
    #[error("failed to invoke accessor for attribute {name:?}")]
    AccessorInvoke { name: String },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
