use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("router error: {0}")]
    Router(#[from] dss_router::RouterError),

    #[error("layout error: {0}")]
    Layout(#[from] dss_layout::LayoutError),

    #[error("store error: {0}")]
    Store(#[from] dss_store::StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] dss_types::CodecError),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("operation returned no value: {0}")]
    EmptyOutput(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
