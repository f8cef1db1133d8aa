use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed caller input. The message is shown to the caller as-is.
    #[error("{0}")]
    InvalidInput(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        DomainError::InvalidInput(msg.into())
    }
}
