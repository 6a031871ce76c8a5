//! Scheduler types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// A message recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Phone number in international format (country code + number, digits only).
    pub phone_number: String,
    /// IANA timezone name (e.g. "America/New_York").
    pub timezone: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Contact {
    /// Create a contact with no display name.
    pub fn new(phone_number: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            timezone: timezone.into(),
            name: None,
        }
    }

    /// Name to show in logs and summaries, falling back to the phone number.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.phone_number)
    }
}

/// The wall-clock moment at which every recipient should receive the
/// message, interpreted in each recipient's own timezone.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTarget {
    /// Target calendar date.
    pub date: NaiveDate,
    /// Target local time (seconds are ignored at resolution).
    pub time: NaiveTime,
}

impl SendTarget {
    /// Parse a target from `"YYYY-MM-DD"` and `"HH:MM"` strings.
    pub fn parse(date: &str, time: &str) -> Result<Self, ResolveError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ResolveError::InvalidTarget(date.to_string()))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| ResolveError::InvalidTarget(time.to_string()))?;
        Ok(Self { date, time })
    }
}

/// Read-only snapshot of a pending job, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    /// The recipient this job delivers to.
    pub contact: Contact,
    /// The absolute instant at which the job fires.
    pub fire_at: DateTime<Utc>,
    /// Cron-style trigger expression matching `fire_at` exactly.
    pub cron_expression: String,
    /// When this job was scheduled.
    pub created_at: DateTime<Utc>,
}
