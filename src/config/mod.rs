//! Configuration loading and management for the reports pipeline.
//!
//! The configuration is an immutable value built once at startup from
//! `pipeline.yaml` and the process environment, then passed explicitly to
//! each component.
//!
//! # Example
//!
//! ```no_run
//! use team_reports::config::{ConfigLoader, Credentials};
//!
//! let config = ConfigLoader::load("./config/pipeline.yaml").unwrap().into_config();
//! let credentials = Credentials::from_env().unwrap();
//! println!("Org units: {:?}", config.business_rules.org_units);
//! # let _ = credentials;
//! ```

mod credentials;
mod loader;
mod types;

pub use credentials::{BiCredentials, Credentials, SmtpCredentials};
pub use loader::ConfigLoader;
pub use types::{
    AlertConfig, BiConfig, BusinessRules, ColumnSpec, EmailTemplates, LoggingConfig, PathsConfig,
    PipelineConfig, ReportConfig, RetrySettings, RosterConfig, RoutingMode, RoutingRule,
    ScheduleConfig, SmtpConfig, default_columns,
};
