//! Error types for message delivery.

use thiserror::Error;

/// Errors produced by a transport send attempt.
///
/// The retry loop does not inspect the variant: every failure is retried
/// uniformly until attempts are exhausted.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway rejected the request.
    #[error("gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    /// Gateway never signalled readiness.
    #[error("transport not ready")]
    NotReady,
}
