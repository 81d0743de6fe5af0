use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Data source error: {0}")]
    Source(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn store(err: anyhow::Error) -> Self {
        CoreError::Store(format!("{err:#}"))
    }

    pub(crate) fn source(err: anyhow::Error) -> Self {
        CoreError::Source(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
