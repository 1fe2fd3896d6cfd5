use dss_types::{OwnerId, Word};

/// Errors from slot store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The owner has no word-array in this store.
    #[error("unknown owner: {0}")]
    UnknownOwner(OwnerId),

    /// An owner with this id already exists.
    #[error("owner already exists: {0}")]
    OwnerExists(OwnerId),

    /// A snapshot digest did not match its contents.
    #[error("snapshot digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: Word, computed: Word },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while reading or writing a snapshot file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
