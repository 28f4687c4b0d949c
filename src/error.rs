//! Errors raised while acquiring the dictionary.
//!
//! Each [`LoadError`] maps to an [`ErrorKind`] and answers
//! [`Retryable::is_retryable`], which is what the retry executor consults
//! between attempts.
//!
//! | Failure | Kind | Retried |
//! |---------|------|---------|
//! | transport error, timeout | network | yes |
//! | HTTP 408, 429, 5xx | network | yes |
//! | other HTTP 4xx | network | no |
//! | bad or insecure source URL | validation | no |
//! | bad content, too few words | validation | no |
//! | body over the size ceiling | size | no |
//! | cache read/write | storage | no |

use serde::Serialize;
use thiserror::Error;
use wordshape_core::error::{ErrorKind, ValidationError};

use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("invalid dictionary source \"{url}\": {reason}")]
    InvalidSource { url: String, reason: String },

    #[error("dictionary is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("dictionary validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("a dictionary load is already in progress")]
    AlreadyLoading,

    #[error("{0}")]
    Processing(String),

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LoadError>,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Network(_) | LoadError::Timeout { .. } | LoadError::HttpStatus { .. } => {
                ErrorKind::Network
            }
            LoadError::InvalidSource { .. } | LoadError::Validation(_) => ErrorKind::Validation,
            LoadError::TooLarge { .. } => ErrorKind::Size,
            LoadError::Storage(_) => ErrorKind::Storage,
            LoadError::AlreadyLoading | LoadError::Processing(_) => ErrorKind::Processing,
            LoadError::RetriesExhausted { source, .. } => source.kind(),
        }
    }

    /// Summary suitable for the loading state and CLI output.
    pub fn to_failure(&self) -> LoadFailure {
        LoadFailure {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

/// HTTP statuses worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

impl Retryable for LoadError {
    fn is_retryable(&self) -> bool {
        match self {
            LoadError::Network(_) | LoadError::Timeout { .. } => true,
            LoadError::HttpStatus { status, .. } => is_retryable_status(*status),
            LoadError::InvalidSource { .. }
            | LoadError::TooLarge { .. }
            | LoadError::Validation(_)
            | LoadError::Storage(_)
            | LoadError::AlreadyLoading
            | LoadError::Processing(_)
            | LoadError::RetriesExhausted { .. } => false,
        }
    }
}

/// Serializable snapshot of a terminal load failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}
