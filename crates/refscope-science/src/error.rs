use refscope_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("parse error: {0}")]
    ParseFailed(String),

    /// Every tier of the cascade was exhausted; carries the last status.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for ScienceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidIdentifier(msg) => Self::InvalidIdentifier(msg),
            CoreError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Core(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;
