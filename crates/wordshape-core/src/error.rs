//! Shared error taxonomy.
//!
//! Every failure that crosses a module boundary is classified into one of
//! the [`ErrorKind`] buckets. The kind decides two things for callers:
//! whether the operation may be retried, and how the failure is presented
//! (a zero-match filter is a `constraint`, not a crash).

use serde::Serialize;
use thiserror::Error;

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Transport failure, timeout, or a transient HTTP status.
    Network,
    /// Malformed dictionary content or malformed segment input.
    Validation,
    /// Cache read or write failure.
    Storage,
    /// Payload larger than the configured ceiling.
    Size,
    /// The filter ran but nothing satisfied the segments.
    Constraint,
    /// Unexpected internal failure.
    Processing,
}

impl ErrorKind {
    /// Kebab-case label used in CLI output and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
            ErrorKind::Size => "size",
            ErrorKind::Constraint => "constraint",
            ErrorKind::Processing => "processing",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure while cleaning raw dictionary text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty input, or a byte outside printable ASCII and whitespace.
    #[error("content-encoding: {reason}")]
    ContentEncoding { reason: String },

    /// Fewer accepted words than the configured minimum.
    #[error("insufficient-words: found {found} valid words, need at least {required}")]
    InsufficientWords { found: usize, required: usize },
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ContentEncoding { .. } => "content-encoding",
            ValidationError::InsufficientWords { .. } => "insufficient-words",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
