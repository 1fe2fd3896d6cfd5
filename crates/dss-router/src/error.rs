use dss_layout::{CompatReport, LayoutError};
use dss_store::StoreError;
use dss_types::{Address, CodecError, ModuleId, OwnerId};

/// Errors raised by an operation handler. Any of these aborts the dispatch
/// and rolls back its writes.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The handler refused the call.
    #[error("{0}")]
    Revert(String),

    /// The call has fewer arguments than the handler reads.
    #[error("missing argument {index}")]
    MissingArgument { index: usize },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OperationError {
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Revert(reason.into())
    }
}

/// Result alias for operation handlers.
pub type OperationResult = Result<Vec<dss_types::Word>, OperationError>;

/// Errors from routing, binding, and rebinding.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// No operation, fallback, or receive handler matches the call.
    #[error("unroutable call '{selector}' on module {module}")]
    UnroutableCall { module: ModuleId, selector: String },

    /// A binding change requested by someone other than the admin.
    #[error("{requester} is not the admin of owner {owner}")]
    NotAuthorized { owner: OwnerId, requester: Address },

    /// The module id is not registered (or slot 0 no longer holds one).
    #[error("unknown module: {0}")]
    UnknownModule(ModuleId),

    /// The layout guard rejected a rebind.
    #[error("layout of {to} is incompatible with {from}: {report}")]
    LayoutIncompatible {
        from: ModuleId,
        to: ModuleId,
        report: CompatReport,
    },

    /// The selected handler failed; every write it made was discarded.
    #[error("operation '{operation}' failed: {source}")]
    OperationFailed {
        operation: String,
        #[source]
        source: OperationError,
    },

    #[error("unknown owner: {0}")]
    UnknownOwner(OwnerId),

    #[error("owner already exists: {0}")]
    OwnerExists(OwnerId),

    #[error("module already registered: {0}")]
    DuplicateModule(ModuleId),

    #[error("call has {count} arguments, limit is {max}")]
    TooManyArgs { count: usize, max: usize },

    /// A snapshot whose binding record disagrees with its own slots.
    #[error("snapshot binding does not match its slots for owner {0}")]
    SnapshotMismatch(OwnerId),

    /// A snapshot whose mapping slots were derived with another combine
    /// function.
    #[error("snapshot of owner {owner} uses combine {snapshot}, router uses {router}")]
    CombineMismatch {
        owner: OwnerId,
        snapshot: &'static str,
        router: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
