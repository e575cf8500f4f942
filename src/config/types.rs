//! Configuration types for the reports pipeline.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from `pipeline.yaml`. Every section has defaults so a
//! file only needs to name what differs.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Power BI endpoints and client behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BiConfig {
    /// Azure AD authority, without the tenant segment.
    pub authority_url: String,
    /// Power BI REST base, e.g. `https://api.powerbi.com/v1.0/myorg`.
    pub api_base_url: String,
    /// OAuth scope requested with the client credentials.
    pub scope: String,
    /// Timeout applied to every individual HTTP request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BiConfig {
    fn default() -> Self {
        Self {
            authority_url: "https://login.microsoftonline.com".to_string(),
            api_base_url: "https://api.powerbi.com/v1.0/myorg".to_string(),
            scope: "https://analysis.windows.net/powerbi/api/.default".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Outgoing mail server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP relay host.
    pub host: String,
    /// Port; 465 means implicit TLS.
    pub port: u16,
    /// Address used in the `From` header.
    pub sender: String,
    /// Display name used in the `From` header.
    pub sender_name: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            sender: "reports@example.com".to_string(),
            sender_name: None,
        }
    }
}

/// Business filters and the segmentation marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusinessRules {
    /// Org units included in every orders query.
    pub org_units: Vec<i64>,
    /// Restricts the orders query to the current month.
    pub current_month_only: bool,
    /// Status value that marks an order as invoiced.
    pub invoiced_status: String,
    /// Status values considered legitimate. When non-empty, any other status
    /// is reported as a data-quality warning (the row is still pending).
    pub known_statuses: Vec<String>,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            org_units: vec![1, 10, 11, 12, 14],
            current_month_only: true,
            invoiced_status: "Faturado".to_string(),
            known_statuses: Vec::new(),
        }
    }
}

/// Location and header names of the roster spreadsheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Path to the roster `.xlsx` file.
    pub path: PathBuf,
    /// Header of the team code column.
    pub team_code_column: String,
    /// Header of the manager name column.
    pub manager_name_column: String,
    /// Header of the email column.
    pub email_column: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/raw/managers.xlsx"),
            team_code_column: "team_code".to_string(),
            manager_name_column: "manager_name".to_string(),
            email_column: "email".to_string(),
        }
    }
}

/// Maps one BI result column onto the internal naming scheme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSpec {
    /// Column name as returned by the query, without table prefix or brackets.
    pub source: String,
    /// Internal name. `org_unit`, `date`, `status` and `value` are typed
    /// fields of an order; any other name is kept as a text attribute.
    pub name: String,
    /// Header written to the report.
    pub header: String,
}

impl ColumnSpec {
    fn new(source: &str, name: &str, header: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
            header: header.to_string(),
        }
    }
}

/// Default column table, in report order.
pub fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Empresa", "org_unit", "Empresa"),
        ColumnSpec::new("Data", "date", "Data"),
        ColumnSpec::new("Nome da Equipe", "team_name", "Equipe"),
        ColumnSpec::new("Nome Vendedor Completo", "seller", "Vendedor"),
        ColumnSpec::new("Nome Completo do Cliente", "customer", "Cliente"),
        ColumnSpec::new("Nota Fiscal - Texto", "invoice_number", "Nota Fiscal"),
        ColumnSpec::new("Pedido - Texto", "order_number", "Pedido"),
        ColumnSpec::new("Legenda Situação", "status", "Situação"),
        ColumnSpec::new("Ingressado", "value", "Ingressado"),
    ]
}

/// Report workbook layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Sheet holding invoiced orders.
    pub invoiced_sheet: String,
    /// Sheet holding every other order.
    pub pending_sheet: String,
    /// Prefix of the attachment file name.
    pub file_prefix: String,
    /// Label of the record-count summary row.
    pub count_label: String,
    /// Label of the value-sum summary row.
    pub total_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            invoiced_sheet: "Invoiced".to_string(),
            pending_sheet: "Pending".to_string(),
            file_prefix: "report_team".to_string(),
            count_label: "Records".to_string(),
            total_label: "Total value".to_string(),
        }
    }
}

/// Tera templates for every outgoing message.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailTemplates {
    /// Subject of a manager report.
    pub report_subject: String,
    /// Body of a manager report.
    pub report_body: String,
    /// Subject of the stale-model alert.
    pub alert_subject: String,
    /// Body of the stale-model alert.
    pub alert_body: String,
}

impl Default for EmailTemplates {
    fn default() -> Self {
        Self {
            report_subject: "Order report - Team {{ team_code }} - {{ manager_name }}".to_string(),
            report_body: "Dear {{ manager_name }},\n\n\
                Attached is the current order report for team {{ team_code }}.\n\n\
                - {{ invoiced_sheet }}: {{ invoiced_count }} invoiced orders ({{ invoiced_value }})\n\
                - {{ pending_sheet }}: {{ pending_count }} pending orders ({{ pending_value }})\n\n\
                This report only contains your team's orders for the current month.\n"
                .to_string(),
            alert_subject: "ALERT: semantic model not refreshed - reports halted".to_string(),
            alert_body: "The semantic model was not refreshed today.\n\n\
                Checked at: {{ checked_at }}\n\
                Last refresh: {{ refreshed_on }}\n\
                Today: {{ today }}\n\
                Reason: {{ reason }}\n\n\
                No reports were sent to managers.\n"
                .to_string(),
        }
    }
}

/// How a routing rule changes the recipients of a team's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// The override recipient replaces the manager.
    Redirect,
    /// The manager still receives the report; the override is copied.
    Copy,
}

/// Sends one team's report somewhere other than (or in addition to) the
/// manager's own address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutingRule {
    /// Team the rule applies to.
    pub team_code: i64,
    /// Override address.
    pub recipient: String,
    /// Replace or copy.
    pub mode: RoutingMode,
}

/// Who hears about a stale semantic model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Operator addresses that receive the alert.
    pub recipients: Vec<String>,
    /// Link to the model settings page, included in the alert.
    pub model_url: Option<String>,
}

/// Retry budgets per network concern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Orders queries.
    pub extraction: RetryPolicy,
    /// Report emails.
    pub delivery: RetryPolicy,
}

/// Working directories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where report files live while they are being sent.
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("data/temp"),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Log file; `None` disables file output.
    pub file: Option<PathBuf>,
    /// Size at which the file is rotated.
    pub max_file_size: u64,
    /// Rotated files kept next to the active one.
    pub backup_count: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("logs/pipeline.log")),
            max_file_size: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

/// Reporting time zone and optional in-process trigger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whole-hour UTC offset that defines "today".
    pub utc_offset_hours: i32,
    /// Local time of the daily run for `--daily-at` without an argument.
    pub daily_at: Option<NaiveTime>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: -3,
            daily_at: NaiveTime::from_hms_opt(9, 0, 0),
        }
    }
}

/// The complete pipeline configuration.
///
/// Constructed once at startup and passed by reference to every component.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// BI API settings.
    #[serde(default)]
    pub bi: BiConfig,
    /// Mail server settings.
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Filters and segmentation marker.
    #[serde(default)]
    pub business_rules: BusinessRules,
    /// Roster spreadsheet.
    #[serde(default)]
    pub roster: RosterConfig,
    /// Column table, in report order.
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnSpec>,
    /// Workbook layout.
    #[serde(default)]
    pub report: ReportConfig,
    /// Message templates.
    #[serde(default)]
    pub templates: EmailTemplates,
    /// Recipient overrides.
    #[serde(default)]
    pub routing: Vec<RoutingRule>,
    /// Stale-model alerting.
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Retry budgets.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Working directories.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Time zone and trigger.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bi: BiConfig::default(),
            smtp: SmtpConfig::default(),
            business_rules: BusinessRules::default(),
            roster: RosterConfig::default(),
            columns: default_columns(),
            report: ReportConfig::default(),
            templates: EmailTemplates::default(),
            routing: Vec::new(),
            alerts: AlertConfig::default(),
            retry: RetrySettings::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}
