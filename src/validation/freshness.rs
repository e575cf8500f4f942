//! Semantic-model freshness gate.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::bi::{LAST_REFRESH_COLUMN, QueryExecutor, last_refresh_query};
use crate::clock::Clock;
use crate::models::RawRow;
use crate::transform::parse_date;

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessStatus {
    /// The model was refreshed today.
    Fresh,
    /// The model's last refresh is on another date.
    Stale,
    /// The refresh table has no usable value.
    EmptyTable,
    /// The refresh date could not be read at all.
    Unavailable,
}

/// Details of one freshness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreshnessReport {
    /// Check outcome.
    pub status: FreshnessStatus,
    /// Last refresh date, when one could be read.
    pub refreshed_on: Option<NaiveDate>,
    /// Today's date in the reporting offset.
    pub today: NaiveDate,
    /// When the check ran.
    pub checked_at: DateTime<FixedOffset>,
    /// Human-readable explanation.
    pub reason: String,
    /// Whether the operator alert went out.
    pub alert_sent: bool,
}

impl FreshnessReport {
    /// Returns true when the run may proceed.
    pub fn passed(&self) -> bool {
        self.status == FreshnessStatus::Fresh
    }
}

/// Compares the model's last refresh date with today.
pub struct FreshnessValidator<'a> {
    executor: &'a dyn QueryExecutor,
    clock: &'a dyn Clock,
}

impl<'a> FreshnessValidator<'a> {
    /// Creates a validator.
    pub fn new(executor: &'a dyn QueryExecutor, clock: &'a dyn Clock) -> Self {
        Self { executor, clock }
    }

    /// Runs the check once. Query failures are not retried; they produce an
    /// [`FreshnessStatus::Unavailable`] report.
    pub async fn check(&self) -> FreshnessReport {
        let checked_at = self.clock.now();
        let today = checked_at.date_naive();

        let (status, refreshed_on, reason) = match self.executor.execute(&last_refresh_query()).await
        {
            Err(e) => (
                FreshnessStatus::Unavailable,
                None,
                format!("refresh date query failed: {}", e),
            ),
            Ok(rows) => match refresh_value(&rows) {
                None => (
                    FreshnessStatus::EmptyTable,
                    None,
                    "refresh table is empty".to_string(),
                ),
                Some(value) => match parse_date(value) {
                    None => (
                        FreshnessStatus::Unavailable,
                        None,
                        format!("unrecognized refresh date {}", value),
                    ),
                    Some(date) if date == today => {
                        (FreshnessStatus::Fresh, Some(date), "refreshed today".to_string())
                    }
                    Some(date) => (
                        FreshnessStatus::Stale,
                        Some(date),
                        format!("last refresh was {}", date.format("%d/%m/%Y")),
                    ),
                },
            },
        };

        let report = FreshnessReport {
            status,
            refreshed_on,
            today,
            checked_at,
            reason,
            alert_sent: false,
        };

        if report.passed() {
            info!(refreshed_on = ?report.refreshed_on, "Semantic model is fresh");
        } else {
            error!(
                status = ?report.status,
                refreshed_on = ?report.refreshed_on,
                today = %report.today,
                reason = %report.reason,
                "Semantic model is not fresh"
            );
        }
        report
    }
}

/// Picks the refresh value from the first row: the named column when
/// present, otherwise the first non-empty cell.
fn refresh_value(rows: &[RawRow]) -> Option<&Value> {
    let row = rows.first()?;
    let is_present = |value: &&Value| match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    };

    let bracketed = format!("[{}]", LAST_REFRESH_COLUMN);
    [LAST_REFRESH_COLUMN, bracketed.as_str()]
        .iter()
        .find_map(|key| row.get(*key).filter(is_present))
        .or_else(|| row.values().find(is_present))
}
