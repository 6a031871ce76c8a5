//! Error types for the scheduler.

use thiserror::Error;

/// Per-recipient scheduling input errors.
///
/// These are recovered locally: the recipient is logged and skipped, the
/// rest of the batch continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Timezone name did not resolve against the IANA database.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Malformed target date/time, or one that does not exist on the calendar.
    #[error("invalid target date/time: {0}")]
    InvalidTarget(String),
}

/// Errors that can occur in scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Firing instant could not be resolved for this recipient.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A job already exists for this recipient.
    #[error("job already exists for {0}")]
    JobExists(String),
}
