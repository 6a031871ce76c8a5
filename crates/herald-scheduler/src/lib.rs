//! Timezone-aware one-shot message scheduling for Herald.
//!
//! This crate provides the scheduling core:
//! - Resolves "send at local wall-clock time T in the recipient's timezone"
//!   to a concrete future UTC instant
//! - Manages the table of pending one-shot triggers, one per recipient
//! - Supports per-recipient and bulk cancellation

mod error;
mod resolver;
mod scheduler;
mod types;

pub use error::{ResolveError, SchedulerError};
pub use resolver::{TimeResolver, cron_expression};
pub use scheduler::{JobCallback, Scheduler};
pub use types::{Contact, JobInfo, SendTarget};
