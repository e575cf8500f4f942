//! Per-team order extraction with retry.

use tracing::{debug, info};

use crate::bi::{QueryExecutor, orders_by_team};
use crate::config::BusinessRules;
use crate::error::PipelineResult;
use crate::models::RawRow;
use crate::retry::{RetryPolicy, Sleeper};

/// Fetches the current orders of one team from the semantic model.
pub struct OrderExtractor<'a> {
    executor: &'a dyn QueryExecutor,
    rules: &'a BusinessRules,
    retry: &'a RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> OrderExtractor<'a> {
    /// Creates an extractor.
    pub fn new(
        executor: &'a dyn QueryExecutor,
        rules: &'a BusinessRules,
        retry: &'a RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            executor,
            rules,
            retry,
            sleeper,
        }
    }

    /// Returns the raw order rows for `team_code`.
    ///
    /// Transient failures are retried under the extraction policy. A team
    /// with no orders yields an empty vector, not an error.
    pub async fn extract(&self, team_code: i64) -> PipelineResult<Vec<RawRow>> {
        let query = orders_by_team(team_code, self.rules);
        let operation = format!("orders query for team {}", team_code);

        let rows = self
            .retry
            .run(&operation, self.sleeper, |attempt| {
                debug!(team_code, attempt, "Querying orders");
                self.executor.execute(&query)
            })
            .await?;

        info!(team_code, records = rows.len(), "Orders extracted");
        Ok(rows)
    }
}
