//! End-to-end run: freshness gate, roster, then each manager in turn.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::bi::QueryExecutor;
use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::delivery::{AlertNotifier, MailTransport, MessageComposer, ReportDelivery, Router};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{OrderExtractor, RosterSource};
use crate::models::{Manager, ManagerFailure, RunStatistics, SegmentedReport, Stage};
use crate::pipeline::outcome::{AbortReason, RunOptions, RunOutcome, RunReport};
use crate::report::ReportBuilder;
use crate::retry::Sleeper;
use crate::transform::Transformer;
use crate::validation::{FreshnessReport, FreshnessValidator};

/// Drives one reporting run.
///
/// Managers are processed strictly one after another. A failure at any
/// stage of one manager is recorded and the run moves on to the next.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    executor: Arc<dyn QueryExecutor>,
    mailer: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
    /// Creates a pipeline over its collaborators.
    pub fn new(
        config: Arc<PipelineConfig>,
        executor: Arc<dyn QueryExecutor>,
        mailer: Arc<dyn MailTransport>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            executor,
            mailer,
            clock,
            sleeper,
        }
    }

    /// Runs the pipeline once.
    ///
    /// A stale semantic model or an empty roster end the run as
    /// [`RunOutcome::Aborted`] before any manager is touched. A missing or
    /// malformed roster is returned as an error.
    pub async fn run(&self, options: &RunOptions) -> PipelineResult<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id, options).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, options: &RunOptions) -> PipelineResult<RunReport> {
        let started_at = self.clock.now();
        let mut statistics = RunStatistics::default();
        let mut failures = Vec::new();

        info!(
            teams = ?options.teams,
            validate_only = options.validate_only,
            "Pipeline run started"
        );

        let mut freshness = self.check_freshness().await;
        if !freshness.passed() {
            if options.validate_only {
                info!("Validate-only mode: stale-model alert suppressed");
            } else {
                freshness.alert_sent = self.alert_notifier().notify(&freshness).await;
            }
            error!("Pipeline halted: semantic model not refreshed today");
            let outcome = RunOutcome::Aborted(AbortReason::StaleSemanticModel {
                refreshed_on: freshness.refreshed_on,
                today: freshness.today,
                alert_sent: freshness.alert_sent,
            });
            return Ok(self.finish(run_id, started_at, outcome, statistics, failures));
        }

        let roster = RosterSource::new(&self.config.roster).load(options.teams.as_deref())?;
        if roster.managers.is_empty() {
            warn!("No valid managers to process");
            let outcome = RunOutcome::Aborted(AbortReason::EmptyRoster);
            return Ok(self.finish(run_id, started_at, outcome, statistics, failures));
        }

        let total = roster.managers.len();
        for (index, manager) in roster.managers.iter().enumerate() {
            info!(
                team_code = manager.team_code,
                manager = %manager.name,
                "Processing manager {}/{}",
                index + 1,
                total
            );

            match self.process_manager(manager, options.validate_only).await {
                Ok(report) => statistics.record_success(&report),
                Err(failure) => {
                    error!(
                        team_code = failure.team_code,
                        stage = %failure.stage,
                        error = %failure.error,
                        "Manager failed"
                    );
                    statistics.record_failure();
                    failures.push(failure);
                }
            }
        }

        Ok(self.finish(run_id, started_at, RunOutcome::Completed, statistics, failures))
    }

    /// Runs only the freshness check, never alerting.
    pub async fn check_freshness(&self) -> FreshnessReport {
        FreshnessValidator::new(self.executor.as_ref(), self.clock.as_ref())
            .check()
            .await
    }

    /// Verifies both external services are reachable.
    pub async fn preflight(&self) -> PipelineResult<()> {
        self.executor.check_connection().await?;
        self.mailer.test_connection().await?;
        info!("Preflight checks passed");
        Ok(())
    }

    async fn process_manager(
        &self,
        manager: &Manager,
        validate_only: bool,
    ) -> Result<SegmentedReport, ManagerFailure> {
        let fail = move |stage: Stage| {
            move |error: PipelineError| ManagerFailure {
                team_code: manager.team_code,
                manager_name: manager.name.clone(),
                stage,
                error: error.to_string(),
            }
        };

        let config = self.config.as_ref();
        let rows = OrderExtractor::new(
            self.executor.as_ref(),
            &config.business_rules,
            &config.retry.extraction,
            self.sleeper.as_ref(),
        )
        .extract(manager.team_code)
        .await
        .map_err(fail(Stage::Extract))?;

        let report = Transformer::new(&config.business_rules, &config.columns)
            .transform(&rows)
            .map_err(fail(Stage::Transform))?;

        let file = ReportBuilder::new(&config.report, &config.columns, &config.paths.temp_dir)
            .build(manager, &report)
            .map_err(fail(Stage::Build))?;

        if validate_only {
            info!(team_code = manager.team_code, "Validate-only mode: email suppressed");
        } else {
            self.report_delivery()
                .deliver(manager, &report, &file)
                .await
                .map_err(fail(Stage::Send))?;
        }

        file.close();
        Ok(report)
    }

    fn composer(&self) -> MessageComposer<'_> {
        MessageComposer::new(&self.config.templates, &self.config.report, &self.config.alerts)
    }

    fn report_delivery(&self) -> ReportDelivery<'_> {
        ReportDelivery::new(
            self.mailer.as_ref(),
            self.composer(),
            Router::new(&self.config.routing),
            &self.config.retry.delivery,
            self.sleeper.as_ref(),
        )
    }

    fn alert_notifier(&self) -> AlertNotifier<'_> {
        AlertNotifier::new(
            self.mailer.as_ref(),
            self.composer(),
            &self.config.alerts.recipients,
        )
    }

    fn finish(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<chrono::FixedOffset>,
        outcome: RunOutcome,
        mut statistics: RunStatistics,
        failures: Vec<ManagerFailure>,
    ) -> RunReport {
        statistics.elapsed = (self.clock.now() - started_at).to_std().unwrap_or_default();

        info!(
            outcome = ?outcome,
            managers_total = statistics.managers_total(),
            managers_processed = statistics.managers_processed,
            managers_failed = statistics.managers_failed,
            success_rate = statistics.success_rate(),
            records_total = statistics.records_total,
            invoiced = statistics.invoiced_count,
            pending = statistics.pending_count,
            invoiced_value = %statistics.invoiced_value,
            pending_value = %statistics.pending_value,
            elapsed_ms = statistics.elapsed.as_millis() as u64,
            "Pipeline run finished"
        );

        RunReport {
            run_id,
            started_at,
            outcome,
            statistics,
            failures,
        }
    }
}
