//! CLI binary for the team reports pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveTime;
use clap::Parser;
use tracing::{error, info};

use team_reports::bi::PowerBiClient;
use team_reports::clock::{Clock, SystemClock};
use team_reports::config::{ConfigLoader, Credentials, PipelineConfig};
use team_reports::delivery::SmtpMailer;
use team_reports::logging::init_logging;
use team_reports::pipeline::{AbortReason, Pipeline, RunOptions, RunOutcome, RunReport};
use team_reports::retry::{Sleeper, TokioSleeper};
use team_reports::scheduler::DailySchedule;
use team_reports::validation::FreshnessReport;

const FAILURES_SHOWN: usize = 3;

/// Emails each team manager their current order report.
#[derive(Parser)]
#[command(name = "team-reports", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config/pipeline.yaml")]
    config: PathBuf,

    /// Only process these team codes (comma-separated).
    #[arg(long, value_delimiter = ',')]
    teams: Option<Vec<i64>>,

    /// Build every report but send no email.
    #[arg(long, conflicts_with_all = ["daily", "daily_at"])]
    validate: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Only check that the semantic model was refreshed today.
    #[arg(long, conflicts_with_all = ["preflight", "daily", "daily_at"])]
    check_freshness: bool,

    /// Only check that Power BI and the SMTP server are reachable.
    #[arg(long, conflicts_with_all = ["daily", "daily_at"])]
    preflight: bool,

    /// Stay running and start a run every day at `schedule.daily_at`.
    #[arg(long)]
    daily: bool,

    /// Stay running and start a run every day at this time (HH:MM[:SS]).
    #[arg(long, value_parser = parse_time)]
    daily_at: Option<NaiveTime>,
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| format!("expected HH:MM or HH:MM:SS: {}", e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(&cli.config) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging, cli.verbose) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Pipeline failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: PipelineConfig) -> anyhow::Result<bool> {
    let credentials = Credentials::from_env().context("reading credentials from environment")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::from_offset_hours(
        config.schedule.utc_offset_hours,
    )?);
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let executor = Arc::new(PowerBiClient::new(&config.bi, &credentials.bi)?);
    let mailer = Arc::new(SmtpMailer::new(&config.smtp, &credentials.smtp)?);

    let daily_at = match (cli.daily_at, cli.daily) {
        (Some(at), _) => Some(at),
        (None, true) => Some(
            config
                .schedule
                .daily_at
                .context("--daily needs schedule.daily_at in the configuration")?,
        ),
        (None, false) => None,
    };
    let pipeline = Pipeline::new(
        Arc::new(config),
        executor,
        mailer,
        clock.clone(),
        sleeper.clone(),
    );

    if cli.preflight {
        pipeline.preflight().await.context("preflight checks failed")?;
        println!("Preflight checks passed");
        return Ok(true);
    }

    if cli.check_freshness {
        let freshness = pipeline.check_freshness().await;
        display_freshness(&freshness);
        return Ok(freshness.passed());
    }

    let options = RunOptions {
        teams: cli.teams,
        validate_only: cli.validate,
    };

    match daily_at {
        Some(at) => {
            info!(at = %at, "Starting daily schedule");
            let pipeline = &pipeline;
            let options = &options;
            DailySchedule::new(at)
                .run(clock.as_ref(), sleeper.as_ref(), || async move {
                    match pipeline.run(options).await {
                        Ok(report) => display_results(&report),
                        Err(e) => error!(error = %e, "Scheduled run failed"),
                    }
                })
                .await;
            Ok(true)
        }
        None => {
            let report = pipeline.run(&options).await?;
            display_results(&report);
            Ok(report.is_completed())
        }
    }
}

fn display_freshness(freshness: &FreshnessReport) {
    let refreshed = freshness
        .refreshed_on
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("Semantic model status: {:?}", freshness.status);
    println!("  Last refresh: {}", refreshed);
    println!("  Today:        {}", freshness.today);
    println!("  Reason:       {}", freshness.reason);
}

fn display_results(report: &RunReport) {
    let stats = &report.statistics;
    println!();
    println!("Run {}", report.run_id);

    match &report.outcome {
        RunOutcome::Completed => println!("Outcome: completed"),
        RunOutcome::Aborted(AbortReason::StaleSemanticModel {
            refreshed_on,
            today,
            alert_sent,
        }) => {
            println!("Outcome: aborted, semantic model not refreshed today");
            println!(
                "  Last refresh: {}, today: {}, alert sent: {}",
                refreshed_on.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string()),
                today,
                alert_sent
            );
        }
        RunOutcome::Aborted(AbortReason::EmptyRoster) => {
            println!("Outcome: aborted, no valid managers to process")
        }
    }

    println!(
        "Managers:  {} processed, {} failed ({:.1}% success)",
        stats.managers_processed,
        stats.managers_failed,
        stats.success_rate()
    );
    println!(
        "Orders:    {} total, {} invoiced ({:.2}), {} pending ({:.2})",
        stats.records_total,
        stats.invoiced_count,
        stats.invoiced_value,
        stats.pending_count,
        stats.pending_value
    );
    println!("Elapsed:   {:.1}s", stats.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        println!("Failures:");
        for failure in report.failures.iter().take(FAILURES_SHOWN) {
            println!(
                "  team {} ({}) at {}: {}",
                failure.team_code, failure.manager_name, failure.stage, failure.error
            );
        }
        if report.failures.len() > FAILURES_SHOWN {
            println!("  ... and {} more", report.failures.len() - FAILURES_SHOWN);
        }
    }
}
