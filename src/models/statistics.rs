//! Run-level accounting.
//!
//! [`RunStatistics`] is accumulated by the orchestrator as it walks the
//! roster and emitted once when the run ends. [`ManagerFailure`] records why
//! a single manager did not get a report.

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use super::SegmentedReport;

/// Pipeline stage at which a manager's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Orders query.
    Extract,
    /// Reshaping into segments.
    Transform,
    /// Writing the spreadsheet.
    Build,
    /// Composing or sending the email.
    Send,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Build => "build",
            Stage::Send => "send",
        };
        f.write_str(name)
    }
}

/// One manager that did not receive a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerFailure {
    /// Team of the failed manager.
    pub team_code: i64,
    /// Name of the failed manager.
    pub manager_name: String,
    /// Stage that failed.
    pub stage: Stage,
    /// Rendered error.
    pub error: String,
}

/// Counters and timings for one pipeline run.
///
/// # Example
///
/// ```
/// use team_reports::models::{RunStatistics, SegmentedReport};
///
/// let mut stats = RunStatistics::default();
/// stats.record_success(&SegmentedReport::default());
/// stats.record_failure();
/// assert_eq!(stats.managers_total(), 2);
/// assert_eq!(stats.success_rate(), 50.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Managers whose report was built (and sent, outside validate-only mode).
    pub managers_processed: usize,
    /// Managers that failed at any stage.
    pub managers_failed: usize,
    /// Order records across all successful managers.
    pub records_total: usize,
    /// Invoiced records across all successful managers.
    pub invoiced_count: usize,
    /// Pending records across all successful managers.
    pub pending_count: usize,
    /// Invoiced value across all successful managers.
    pub invoiced_value: Decimal,
    /// Pending value across all successful managers.
    pub pending_value: Decimal,
    /// Wall time of the run.
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Adds one successfully processed manager and its report totals.
    pub fn record_success(&mut self, report: &SegmentedReport) {
        self.managers_processed += 1;
        self.records_total += report.total_count();
        self.invoiced_count += report.invoiced_totals.count;
        self.pending_count += report.pending_totals.count;
        self.invoiced_value += report.invoiced_totals.sum_value;
        self.pending_value += report.pending_totals.sum_value;
    }

    /// Adds one failed manager.
    pub fn record_failure(&mut self) {
        self.managers_failed += 1;
    }

    /// Managers attempted in this run.
    pub fn managers_total(&self) -> usize {
        self.managers_processed + self.managers_failed
    }

    /// Value across both segments.
    pub fn total_value(&self) -> Decimal {
        self.invoiced_value + self.pending_value
    }

    /// Percentage of attempted managers that succeeded; 0 when none ran.
    pub fn success_rate(&self) -> f64 {
        let total = self.managers_total();
        if total == 0 {
            return 0.0;
        }
        self.managers_processed as f64 / total as f64 * 100.0
    }
}
