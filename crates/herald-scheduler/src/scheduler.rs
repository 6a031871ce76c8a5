//! Job scheduler implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{Contact, JobInfo, SchedulerError, TimeResolver, cron_expression};

/// Type alias for the delivery callback invoked when a job fires.
///
/// Returns whether the message was delivered; the outcome is logged but a
/// failed delivery never affects other recipients' jobs.
pub type JobCallback =
    Arc<dyn Fn(Contact) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// A pending one-shot job owned by the scheduler.
struct ScheduledJob {
    info: JobInfo,
    trigger: AbortHandle,
}

/// The message scheduler.
///
/// Owns the table of pending jobs, keyed by recipient phone number. Each
/// job is a spawned task that sleeps until its firing instant, runs the
/// delivery callback, and removes itself from the table. The table lock is
/// held only around insert/remove, never across the callback or its
/// retries, so one recipient's delivery can never delay another's trigger.
pub struct Scheduler {
    resolver: TimeResolver,
    jobs: Arc<RwLock<HashMap<String, ScheduledJob>>>,
}

impl Scheduler {
    /// Create a new scheduler.
    pub fn new(resolver: TimeResolver) -> Self {
        Self {
            resolver,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Schedule a one-shot delivery for a contact.
    ///
    /// Resolution failures are logged and returned without touching the job
    /// table, so a bad recipient never blocks the rest of a batch. A
    /// recipient with a pending job is rejected with
    /// [`SchedulerError::JobExists`].
    pub async fn schedule_message(
        &self,
        contact: Contact,
        callback: JobCallback,
    ) -> Result<JobInfo, SchedulerError> {
        let now = Utc::now();
        let fire_at = match self.resolver.resolve(&contact.timezone, now) {
            Ok(at) => at,
            Err(e) => {
                warn!(
                    phone = %contact.phone_number,
                    timezone = %contact.timezone,
                    error = %e,
                    "failed to resolve firing instant"
                );
                return Err(e.into());
            }
        };

        // Test mode may carry an unparseable zone; fall back to UTC for the
        // display expression only.
        let tz = contact.timezone.parse().unwrap_or(chrono_tz::UTC);
        let info = JobInfo {
            contact: contact.clone(),
            fire_at,
            cron_expression: cron_expression(fire_at, tz),
            created_at: now,
        };

        let delay = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        let phone = contact.phone_number.clone();

        let mut table = self.jobs.write().await;
        if table.contains_key(&phone) {
            return Err(SchedulerError::JobExists(phone));
        }

        // The write lock is still held here, so the spawned task cannot
        // observe (or clean up) the table before its own entry is inserted.
        let jobs = Arc::clone(&self.jobs);
        let trigger = tokio::spawn(async move {
            sleep(delay).await;

            // The delivery runs in its own task: aborting the trigger must
            // never interrupt a delivery (or its backoff) already in flight.
            tokio::spawn(async move {
                info!(phone = %contact.phone_number, "executing scheduled message");
                let delivered = callback(contact.clone()).await;
                if !delivered {
                    warn!(phone = %contact.phone_number, "delivery failed after retries");
                }

                // Cleanup is unconditional: the job leaves the table whether
                // the delivery succeeded or exhausted its retries.
                jobs.write().await.remove(&contact.phone_number);
            });
        })
        .abort_handle();

        table.insert(
            phone,
            ScheduledJob {
                info: info.clone(),
                trigger,
            },
        );
        drop(table);

        info!(
            phone = %info.contact.phone_number,
            fire_at = %info.fire_at,
            cron = %info.cron_expression,
            "scheduled message"
        );
        Ok(info)
    }

    /// Cancel a pending job. Returns whether a job existed.
    ///
    /// Idempotent: cancelling an unknown recipient is a no-op. A delivery
    /// that already started runs to completion or exhaustion.
    pub async fn cancel_schedule(&self, phone_number: &str) -> bool {
        match self.jobs.write().await.remove(phone_number) {
            Some(job) => {
                job.trigger.abort();
                info!(phone = %phone_number, "cancelled scheduled message");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending job. Used at shutdown.
    ///
    /// Safe on an empty table and safe to call repeatedly.
    pub async fn cancel_all_schedules(&self) {
        let mut jobs = self.jobs.write().await;
        for (phone, job) in jobs.drain() {
            job.trigger.abort();
            info!(phone = %phone, "cancelled scheduled message");
        }
    }

    /// Snapshots of all pending jobs, for reporting. Order is unspecified.
    pub async fn active_schedules(&self) -> Vec<JobInfo> {
        self.jobs.read().await.values().map(|j| j.info.clone()).collect()
    }

    /// Number of pending jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}
