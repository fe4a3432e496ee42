//! Error types for playlist sequencing.
//!
//! Only a malformed request is fatal to an optimisation call. Exhausted
//! search budgets, unsatisfiable hard rules and tracks with missing
//! attributes all degrade gracefully and are reported through
//! [`crate::result::Diagnostics`] instead.

use thiserror::Error;

/// Top-level error type for segue operations
#[derive(Debug, Error)]
pub enum SegueError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SegueError {
    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by the caller's input rather than the environment
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SegueError::InvalidRequest { .. } | SegueError::InvalidConfig(_)
        )
    }
}

/// Result type alias for segue operations
pub type Result<T> = std::result::Result<T, SegueError>;
