//! Run options and results.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ManagerFailure, RunStatistics};

/// Knobs for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Restrict processing to these team codes.
    pub teams: Option<Vec<i64>>,
    /// Build every report but send no email of any kind.
    pub validate_only: bool,
}

/// Why a run stopped before processing managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The semantic model was not refreshed today.
    StaleSemanticModel {
        /// Last refresh date, when readable.
        refreshed_on: Option<NaiveDate>,
        /// Today's date.
        today: NaiveDate,
        /// Whether the operator alert went out.
        alert_sent: bool,
    },
    /// No valid manager remained after roster validation and filtering.
    EmptyRoster,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every manager was attempted. Some may have failed individually.
    Completed,
    /// The run stopped before touching any manager.
    Aborted(AbortReason),
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of the run, present in every log line of it.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<FixedOffset>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Counters and timings.
    pub statistics: RunStatistics,
    /// Managers that did not receive a report.
    pub failures: Vec<ManagerFailure>,
}

impl RunReport {
    /// Returns true when the run reached the end of the roster.
    pub fn is_completed(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}
