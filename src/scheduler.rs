//! In-process daily scheduling for unattended runs.

use std::future::Future;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use tracing::info;

use crate::clock::Clock;
use crate::retry::Sleeper;

/// Returns the first instant strictly after `now` whose wall-clock time in
/// `now`'s offset is `at`.
///
/// # Example
///
/// ```
/// use chrono::{DateTime, NaiveTime};
/// use team_reports::scheduler::next_run_after;
///
/// let now = DateTime::parse_from_rfc3339("2026-10-16T10:00:00-03:00").unwrap();
/// let at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
///
/// let next = next_run_after(now, at);
/// assert_eq!(next.to_rfc3339(), "2026-10-17T09:00:00-03:00");
/// ```
pub fn next_run_after(now: DateTime<FixedOffset>, at: NaiveTime) -> DateTime<FixedOffset> {
    let mut wait = now.date_naive().and_time(at) - now.naive_local();
    if wait <= Duration::zero() {
        wait += Duration::days(1);
    }
    now + wait
}

/// Runs a job once a day at a fixed local time.
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// Creates a schedule firing at `at` every day.
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Sleeps until each next occurrence and runs `job`, forever.
    pub async fn run<F, Fut>(&self, clock: &dyn Clock, sleeper: &dyn Sleeper, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let now = clock.now();
            let next = next_run_after(now, self.at);
            info!(next_run = %next, "Waiting for next scheduled run");
            sleeper.sleep((next - now).to_std().unwrap_or_default()).await;
            job().await;
        }
    }
}
