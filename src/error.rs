//! Error types for `KeyedTable` operations.

/// Failures reported by [`KeyedTable`](crate::KeyedTable).
///
/// Every variant is recoverable by the caller; the table never retries on its
/// own and never aborts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum TableError {
    /// The table has not been successfully initialized.
    ///
    /// Returned by mutating operations on a table that is still
    /// uninitialized or whose last initialization attempt failed.
    #[error("table is not initialized")]
    NotInitialized,

    /// Memory for the bucket array or for an entry's key copy could not be
    /// reserved. The table is left exactly as it was.
    #[error("memory allocation failed")]
    AllocationFailed,

    /// No entry with the requested key exists.
    #[error("key not found")]
    KeyNotFound,

    /// `initialize` was called with a capacity of zero.
    #[error("capacity must be at least one bucket")]
    ZeroCapacity,

    /// `initialize` was called on a table that is already initialized.
    #[error("table is already initialized")]
    AlreadyInitialized,
}
