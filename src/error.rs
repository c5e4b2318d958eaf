//! Core error type
//!
//! Every failure the coordinator can observe is one of these kinds. Fetch
//! failures end up in `FetchStatus::Failed`, mutation failures end up in a
//! notification; neither escapes the session.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Transport unreachable or non-2xx response
    #[error("Network error: {0}")]
    Network(String),

    /// Response shape did not match the resource schema
    #[error("Decode error: {0}")]
    Decode(String),

    /// Draft failed a required-field or format check
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Request exceeded the configured duration
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Record was changed or removed elsewhere
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A mutation for the same target is still in flight
    #[error("A request for {0} is already in progress")]
    Busy(String),

    /// Session is in read-only mode
    #[error("Read-only mode: {0} is disabled")]
    ReadOnly(String),

    /// Operation not valid for the current modal/selection state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Whether the error is an expected outcome of operator input rather than
    /// a fault. Expected errors log at `warn`, the rest at `error`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::Busy(_)
            | Self::ReadOnly(_)
            | Self::InvalidState(_)
            | Self::Conflict(_) => true,
            Self::Network(_) | Self::Decode(_) | Self::Timeout(_) => false,
        }
    }

    /// Whether retrying the same request might succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Core result alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Log an error at the level its kind calls for
pub(crate) fn log_error(context: &str, error: &CoreError) {
    if error.is_expected() {
        tracing::warn!("{}: {}", context, error);
    } else {
        tracing::error!("{}: {}", context, error);
    }
}
