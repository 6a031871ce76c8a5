//! Firing-instant resolution.
//!
//! Maps the run's target wall-clock moment into a concrete UTC instant for
//! one recipient's timezone. Resolution is pure: `now` is injected, so the
//! year-rollover logic is testable without a real clock.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::{ResolveError, SendTarget};

/// Resolves firing instants for recipients.
///
/// One resolver is built per run and shared by every recipient; only the
/// timezone varies per call.
#[derive(Debug, Clone, Copy)]
pub struct TimeResolver {
    target: SendTarget,
    test_mode: bool,
    test_delay: Duration,
}

impl TimeResolver {
    /// Create a resolver for the given target.
    pub fn new(target: SendTarget) -> Self {
        Self {
            target,
            test_mode: false,
            test_delay: Duration::zero(),
        }
    }

    /// Create a resolver that fires `delay_secs` from `now` for every
    /// recipient, ignoring timezones. Lets the whole pipeline be exercised
    /// without waiting for a real calendar date.
    pub fn with_test_mode(target: SendTarget, delay_secs: u64) -> Self {
        Self {
            target,
            test_mode: true,
            test_delay: Duration::seconds(delay_secs as i64),
        }
    }

    /// Whether this resolver is in test mode.
    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Resolve the firing instant for a recipient timezone, relative to `now`.
    ///
    /// The target date and time are interpreted as wall-clock values in the
    /// recipient's timezone, with seconds zeroed. If that instant is at or
    /// before `now`, the calendar year is advanced until the instant is
    /// strictly in the future (a recipient far east of the process clock may
    /// already have passed the target moment when the run starts).
    pub fn resolve(&self, timezone: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ResolveError> {
        if self.test_mode {
            return Ok(now + self.test_delay);
        }

        let tz: Tz = timezone
            .parse()
            .map_err(|_| ResolveError::InvalidTimezone(timezone.to_string()))?;

        let mut year = self.target.date.year();
        loop {
            let instant = self.instant_in_year(tz, year)?;
            if instant > now {
                return Ok(instant);
            }
            year += 1;
        }
    }

    /// The target moment in `tz` with the calendar year replaced by `year`.
    fn instant_in_year(&self, tz: Tz, year: i32) -> Result<DateTime<Utc>, ResolveError> {
        let date = self
            .target
            .date
            .with_year(year)
            // Feb 29 rolled into a non-leap year clamps to Feb 28.
            .or_else(|| NaiveDate::from_ymd_opt(year, self.target.date.month(), 28))
            .ok_or_else(|| ResolveError::InvalidTarget(format!("{}-{}", year, self.target.date)))?;

        let time = self.target.time.with_second(0).unwrap_or(self.target.time);
        let local = date.and_time(time);

        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            // Fall-back overlap: take the earlier (pre-transition) mapping.
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            // Spring-forward gap: the local time does not exist. Shift past
            // the transition by an hour and retry once.
            LocalResult::None => match tz.from_local_datetime(&(local + Duration::hours(1))) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    Ok(dt.with_timezone(&Utc))
                }
                LocalResult::None => Err(ResolveError::InvalidTarget(local.to_string())),
            },
        }
    }
}

/// Derive a 6-field cron expression (`sec min hour dom month dow`) matching
/// the firing instant exactly, with wildcard day-of-week.
///
/// By construction the expression matches only that single calendar moment
/// within the coming ~100 years; it is carried on jobs for reporting. The
/// live trigger is a plain one-shot timer.
pub fn cron_expression(instant: DateTime<Utc>, tz: Tz) -> String {
    let local = instant.with_timezone(&tz);
    format!(
        "{} {} {} {} {} *",
        local.second(),
        local.minute(),
        local.hour(),
        local.day(),
        local.month()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn new_year_resolver() -> TimeResolver {
        TimeResolver::new(SendTarget::parse("2026-01-01", "00:00").unwrap())
    }

    // === Unit Tests ===

    #[test]
    fn resolves_future_target_in_recipient_timezone() {
        // Recipient in New York, one hour before local midnight.
        let now = utc("2025-12-31T23:00:00-05:00");
        let resolved = new_year_resolver().resolve("America/New_York", now).unwrap();

        assert_eq!(resolved, utc("2026-01-01T00:00:00-05:00"));
    }

    #[test]
    fn rolls_over_one_year_when_target_passed() {
        // Five minutes after local midnight: the moment already elapsed.
        let now = utc("2026-01-01T00:05:00-05:00");
        let resolved = new_year_resolver().resolve("America/New_York", now).unwrap();

        assert_eq!(resolved, utc("2027-01-01T00:00:00-05:00"));
    }

    #[test]
    fn resolution_is_deterministic_for_fixed_now() {
        let now = utc("2026-01-01T00:05:00-05:00");
        let resolver = new_year_resolver();

        let first = resolver.resolve("America/New_York", now).unwrap();
        let second = resolver.resolve("America/New_York", now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_timezones_resolve_to_different_instants() {
        let now = utc("2025-06-01T00:00:00Z");
        let resolver = new_year_resolver();

        let kolkata = resolver.resolve("Asia/Kolkata", now).unwrap();
        let new_york = resolver.resolve("America/New_York", now).unwrap();

        // Kolkata reaches midnight before New York does.
        assert!(kolkata < new_york);
        assert_eq!(new_york - kolkata, Duration::hours(10) + Duration::minutes(30));
    }

    #[test]
    fn test_mode_ignores_timezone_and_target() {
        let now = utc("2025-06-01T12:00:00Z");
        let resolver =
            TimeResolver::with_test_mode(SendTarget::parse("2026-01-01", "00:00").unwrap(), 30);

        let a = resolver.resolve("America/New_York", now).unwrap();
        let b = resolver.resolve("Australia/Sydney", now).unwrap();
        let c = resolver.resolve("not/a-zone", now).unwrap();

        assert_eq!(a, now + Duration::seconds(30));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let now = utc("2025-06-01T00:00:00Z");
        let err = new_year_resolver().resolve("Mars/Olympus_Mons", now).unwrap_err();
        assert_eq!(err, ResolveError::InvalidTimezone("Mars/Olympus_Mons".to_string()));
    }

    #[test]
    fn seconds_are_zeroed() {
        let target = SendTarget {
            date: NaiveDate::from_ymd_opt(2026, 7, 4).unwrap(),
            time: chrono::NaiveTime::from_hms_opt(12, 30, 45).unwrap(),
        };
        let now = utc("2025-06-01T00:00:00Z");

        let resolved = TimeResolver::new(target).resolve("UTC", now).unwrap();
        assert_eq!(resolved, utc("2026-07-04T12:30:00Z"));
    }

    #[test]
    fn dst_gap_shifts_past_transition() {
        // 02:30 on 2026-03-08 does not exist in New York (spring forward).
        let target = SendTarget::parse("2026-03-08", "02:30").unwrap();
        let now = utc("2026-01-01T00:00:00Z");

        let resolved = TimeResolver::new(target).resolve("America/New_York", now).unwrap();
        assert_eq!(resolved, utc("2026-03-08T03:30:00-04:00"));
    }

    #[test]
    fn dst_overlap_takes_earlier_mapping() {
        // 01:30 on 2026-11-01 occurs twice in New York (fall back).
        let target = SendTarget::parse("2026-11-01", "01:30").unwrap();
        let now = utc("2026-01-01T00:00:00Z");

        let resolved = TimeResolver::new(target).resolve("America/New_York", now).unwrap();
        assert_eq!(resolved, utc("2026-11-01T01:30:00-04:00"));
    }

    #[test]
    fn leap_day_clamps_when_rolled_to_common_year() {
        let target = SendTarget::parse("2024-02-29", "10:00").unwrap();
        let now = utc("2024-03-01T00:00:00Z");

        let resolved = TimeResolver::new(target).resolve("UTC", now).unwrap();
        assert_eq!(resolved, utc("2025-02-28T10:00:00Z"));
    }

    #[test]
    fn cron_expression_matches_local_fields() {
        let instant = utc("2026-01-01T00:00:00-05:00");
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(cron_expression(instant, tz), "0 0 0 1 1 *");

        let tz: Tz = "UTC".parse().unwrap();
        assert_eq!(cron_expression(instant, tz), "0 0 5 1 1 *");
    }

    // === Property-Based Tests ===

    proptest! {
        // The resolved instant is always strictly in the future.
        #[test]
        fn resolved_instant_is_future(offset_days in -400i64..400, hour in 0u32..24, minute in 0u32..60) {
            let now = utc("2026-01-01T00:00:00Z") + Duration::days(offset_days);
            let target = SendTarget {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                time: chrono::NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            };

            let resolved = TimeResolver::new(target).resolve("Europe/London", now).unwrap();
            prop_assert!(resolved > now);
        }

        // Re-resolving against the same `now` never advances further.
        #[test]
        fn resolution_is_idempotent(offset_days in -400i64..400) {
            let now = utc("2026-01-01T00:00:00Z") + Duration::days(offset_days);
            let resolver = new_year_resolver();

            let first = resolver.resolve("Asia/Kolkata", now).unwrap();
            let second = resolver.resolve("Asia/Kolkata", now).unwrap();
            prop_assert_eq!(first, second);
        }

        // Resolved instants always land on a whole minute.
        #[test]
        fn resolved_instant_has_zero_seconds(hour in 0u32..24, minute in 0u32..60, second in 0u32..60) {
            let now = utc("2025-06-01T00:00:00Z");
            let target = SendTarget {
                date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                time: chrono::NaiveTime::from_hms_opt(hour, minute, second).unwrap(),
            };

            let resolved = TimeResolver::new(target).resolve("America/Los_Angeles", now).unwrap();
            prop_assert_eq!(resolved.second(), 0);
            prop_assert_eq!(resolved.timestamp_subsec_millis(), 0);
        }

        // Test mode resolves to now + delay for any delay.
        #[test]
        fn test_mode_is_now_plus_delay(delay in 0u64..86400) {
            let now = utc("2025-06-01T00:00:00Z");
            let resolver = TimeResolver::with_test_mode(
                SendTarget::parse("2026-01-01", "00:00").unwrap(),
                delay,
            );

            let resolved = resolver.resolve("UTC", now).unwrap();
            prop_assert_eq!(resolved, now + Duration::seconds(delay as i64));
        }
    }
}
