//! Error types for the contact store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Import file path does not exist.
    #[error("contact file not found: {0}")]
    FileNotFound(PathBuf),

    /// Import file could not be read.
    #[error("failed to read contact file: {0}")]
    Io(#[from] std::io::Error),

    /// Import file was not valid contacts JSON.
    #[error("invalid contacts file: expected {{ \"contacts\": [...] }}: {0}")]
    InvalidFormat(#[from] serde_json::Error),
}
