//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the pipeline
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::models::is_valid_email;

use super::types::PipelineConfig;

/// Internal column names an order cannot do without.
const REQUIRED_INTERNAL_COLUMNS: [&str; 4] = ["org_unit", "date", "status", "value"];

/// Loads and validates the pipeline configuration.
///
/// # Example
///
/// ```no_run
/// use team_reports::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/pipeline.yaml").unwrap();
/// println!("Invoiced marker: {}", loader.config().business_rules.invoiced_status);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: PipelineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - The file is missing
    /// - The file contains invalid YAML
    /// - A value fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| PipelineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        Self::parse(&content, &path_str)
    }

    /// Parses configuration from YAML text. `origin` names the source in
    /// error messages.
    pub fn parse(content: &str, origin: &str) -> PipelineResult<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).map_err(|e| PipelineError::ConfigParseError {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        Self::from_config(config)
    }

    /// Wraps an already-built configuration after validating it.
    pub fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        validate(&config)?;
        Ok(Self { config })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> PipelineConfig {
        self.config
    }
}

fn invalid(field: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate(config: &PipelineConfig) -> PipelineResult<()> {
    if !is_valid_email(&config.smtp.sender) {
        return Err(invalid(
            "smtp.sender",
            format!("'{}' is not a valid address", config.smtp.sender),
        ));
    }

    if config.business_rules.org_units.is_empty() {
        return Err(invalid("business_rules.org_units", "at least one org unit is required"));
    }

    if config.business_rules.invoiced_status.trim().is_empty() {
        return Err(invalid("business_rules.invoiced_status", "must not be empty"));
    }

    for (field, policy) in [
        ("retry.extraction.max_attempts", &config.retry.extraction),
        ("retry.delivery.max_attempts", &config.retry.delivery),
    ] {
        if policy.max_attempts == 0 {
            return Err(invalid(field, "must be at least 1"));
        }
    }

    for required in REQUIRED_INTERNAL_COLUMNS {
        if !config.columns.iter().any(|c| c.name == required) {
            return Err(invalid(
                "columns",
                format!("no column maps to internal name '{}'", required),
            ));
        }
    }

    if config.report.invoiced_sheet == config.report.pending_sheet {
        return Err(invalid("report.pending_sheet", "must differ from report.invoiced_sheet"));
    }

    for rule in &config.routing {
        if !is_valid_email(&rule.recipient) {
            return Err(invalid(
                "routing.recipient",
                format!("'{}' for team {} is not a valid address", rule.recipient, rule.team_code),
            ));
        }
    }

    for recipient in &config.alerts.recipients {
        if !is_valid_email(recipient) {
            return Err(invalid(
                "alerts.recipients",
                format!("'{}' is not a valid address", recipient),
            ));
        }
    }

    Ok(())
}
