//! Subject and body rendering with Tera.

use rust_decimal::Decimal;
use tera::{Context, Tera};

use crate::config::{AlertConfig, EmailTemplates, ReportConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Manager, SegmentedReport};
use crate::validation::FreshnessReport;

/// Renders the configured templates into message text.
pub struct MessageComposer<'a> {
    templates: &'a EmailTemplates,
    report: &'a ReportConfig,
    alerts: &'a AlertConfig,
}

/// A rendered subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl<'a> MessageComposer<'a> {
    /// Creates a composer.
    pub fn new(templates: &'a EmailTemplates, report: &'a ReportConfig, alerts: &'a AlertConfig) -> Self {
        Self {
            templates,
            report,
            alerts,
        }
    }

    /// Renders the report message for `manager`.
    ///
    /// Available variables: `manager_name`, `team_code`, `invoiced_sheet`,
    /// `invoiced_count`, `invoiced_value`, `pending_sheet`, `pending_count`,
    /// `pending_value`, `total_count` and `total_value`.
    pub fn report_message(&self, manager: &Manager, report: &SegmentedReport) -> PipelineResult<RenderedMessage> {
        let mut context = Context::new();
        context.insert("manager_name", &manager.name);
        context.insert("team_code", &manager.team_code);
        context.insert("invoiced_sheet", &self.report.invoiced_sheet);
        context.insert("invoiced_count", &report.invoiced_totals.count);
        context.insert("invoiced_value", &format_value(report.invoiced_totals.sum_value));
        context.insert("pending_sheet", &self.report.pending_sheet);
        context.insert("pending_count", &report.pending_totals.count);
        context.insert("pending_value", &format_value(report.pending_totals.sum_value));
        context.insert("total_count", &report.total_count());
        context.insert("total_value", &format_value(report.total_value()));

        Ok(RenderedMessage {
            subject: render("report_subject", &self.templates.report_subject, &context)?,
            body: render("report_body", &self.templates.report_body, &context)?,
        })
    }

    /// Renders the stale-model alert.
    ///
    /// Available variables: `checked_at`, `refreshed_on`, `today`, `reason`
    /// and `model_url` (absent when not configured).
    pub fn alert_message(&self, freshness: &FreshnessReport) -> PipelineResult<RenderedMessage> {
        let mut context = Context::new();
        context.insert(
            "checked_at",
            &freshness.checked_at.format("%d/%m/%Y %H:%M:%S").to_string(),
        );
        context.insert(
            "refreshed_on",
            &freshness
                .refreshed_on
                .map(|date| date.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        );
        context.insert("today", &freshness.today.format("%d/%m/%Y").to_string());
        context.insert("reason", &freshness.reason);
        context.insert("model_url", &self.alerts.model_url);

        Ok(RenderedMessage {
            subject: render("alert_subject", &self.templates.alert_subject, &context)?,
            body: render("alert_body", &self.templates.alert_body, &context)?,
        })
    }
}

fn render(name: &str, template: &str, context: &Context) -> PipelineResult<String> {
    Tera::one_off(template, context, false).map_err(|e| {
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        PipelineError::Template {
            template: name.to_string(),
            message,
        }
    })
}

fn format_value(value: Decimal) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderRecord;
    use chrono::{DateTime, NaiveDate};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(status: &str, value: &str) -> OrderRecord {
        OrderRecord::new(1, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), status, dec(value))
    }

    #[test]
    fn test_report_subject_interpolates_team_and_name() {
        let templates = EmailTemplates::default();
        let report_config = ReportConfig::default();
        let alerts = AlertConfig::default();
        let composer = MessageComposer::new(&templates, &report_config, &alerts);
        let report = SegmentedReport::new(
            vec![record("Faturado", "100"), record("Faturado", "20.5")],
            vec![record("Aberto", "7")],
        );

        let message = composer
            .report_message(&Manager::new(200, "Ana", "ana@x.com"), &report)
            .unwrap();

        assert_eq!(message.subject, "Order report - Team 200 - Ana");
        assert!(message.body.contains("Dear Ana"));
        assert!(message.body.contains("2 invoiced orders (120.50)"));
        assert!(message.body.contains("1 pending orders (7.00)"));
    }

    #[test]
    fn test_alert_renders_dates_and_optional_url() {
        let templates = EmailTemplates {
            alert_body: "{{ refreshed_on }} vs {{ today }}{% if model_url %} at {{ model_url }}{% endif %}"
                .to_string(),
            ..EmailTemplates::default()
        };
        let report_config = ReportConfig::default();
        let freshness = FreshnessReport {
            status: crate::validation::FreshnessStatus::Stale,
            refreshed_on: NaiveDate::from_ymd_opt(2026, 10, 15),
            today: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            checked_at: DateTime::parse_from_rfc3339("2026-10-16T09:00:00-03:00").unwrap(),
            reason: "last refresh was 15/10/2026".to_string(),
            alert_sent: false,
        };

        let without_url = AlertConfig::default();
        let message = MessageComposer::new(&templates, &report_config, &without_url)
            .alert_message(&freshness)
            .unwrap();
        assert_eq!(message.body, "15/10/2026 vs 16/10/2026");

        let with_url = AlertConfig {
            model_url: Some("https://bi.example.com/model".to_string()),
            ..AlertConfig::default()
        };
        let message = MessageComposer::new(&templates, &report_config, &with_url)
            .alert_message(&freshness)
            .unwrap();
        assert!(message.body.ends_with("at https://bi.example.com/model"));
    }

    #[test]
    fn test_broken_template_names_the_template() {
        let templates = EmailTemplates {
            report_subject: "{{ unclosed".to_string(),
            ..EmailTemplates::default()
        };
        let report_config = ReportConfig::default();
        let alerts = AlertConfig::default();
        let composer = MessageComposer::new(&templates, &report_config, &alerts);

        let result = composer.report_message(&Manager::new(1, "A", "a@x.com"), &SegmentedReport::default());
        match result {
            Err(PipelineError::Template { template, .. }) => assert_eq!(template, "report_subject"),
            other => panic!("expected template error, got {:?}", other),
        }
    }
}
