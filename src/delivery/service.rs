//! Report and alert delivery.

use tracing::{error, info, warn};

use crate::delivery::mail::{Attachment, MailTransport, OutgoingMail};
use crate::delivery::routing::{Recipients, Router};
use crate::delivery::templates::MessageComposer;
use crate::error::PipelineResult;
use crate::models::{Manager, SegmentedReport};
use crate::report::{ReportFile, XLSX_CONTENT_TYPE};
use crate::retry::{RetryPolicy, Sleeper};
use crate::validation::FreshnessReport;

/// Sends manager reports with bounded retry.
pub struct ReportDelivery<'a> {
    mailer: &'a dyn MailTransport,
    composer: MessageComposer<'a>,
    router: Router<'a>,
    retry: &'a RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> ReportDelivery<'a> {
    /// Creates a delivery service.
    pub fn new(
        mailer: &'a dyn MailTransport,
        composer: MessageComposer<'a>,
        router: Router<'a>,
        retry: &'a RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            mailer,
            composer,
            router,
            retry,
            sleeper,
        }
    }

    /// Emails `file` to the manager, or to the routing override for their
    /// team. Returns the recipients the message went to.
    ///
    /// Every attempt goes through a fresh transport session. Authentication
    /// failures and permanent rejections end the retry loop immediately.
    pub async fn deliver(
        &self,
        manager: &Manager,
        report: &SegmentedReport,
        file: &ReportFile,
    ) -> PipelineResult<Recipients> {
        let recipients = self.router.recipients_for(manager);
        let rendered = self.composer.report_message(manager, report)?;
        let mail = OutgoingMail {
            to: recipients.to.clone(),
            cc: recipients.cc.clone(),
            subject: rendered.subject,
            body: rendered.body,
            attachment: Some(Attachment {
                filename: file.attachment_name().to_string(),
                content_type: XLSX_CONTENT_TYPE.to_string(),
                content: file.read_bytes()?,
            }),
        };

        let operation = format!("report email for team {}", manager.team_code);
        self.retry
            .run(&operation, self.sleeper, |_attempt| self.mailer.send(&mail))
            .await?;

        info!(
            team_code = manager.team_code,
            to = ?recipients.to,
            cc = ?recipients.cc,
            "Report delivered"
        );
        Ok(recipients)
    }
}

/// Sends the one-shot stale-model alert.
pub struct AlertNotifier<'a> {
    mailer: &'a dyn MailTransport,
    composer: MessageComposer<'a>,
    recipients: &'a [String],
}

impl<'a> AlertNotifier<'a> {
    /// Creates a notifier addressing `recipients`.
    pub fn new(mailer: &'a dyn MailTransport, composer: MessageComposer<'a>, recipients: &'a [String]) -> Self {
        Self {
            mailer,
            composer,
            recipients,
        }
    }

    /// Sends one alert describing `freshness`. Returns whether it went out;
    /// failures are logged, not raised, since the run is aborting anyway.
    pub async fn notify(&self, freshness: &FreshnessReport) -> bool {
        if self.recipients.is_empty() {
            warn!("No alert recipients configured; stale-model alert not sent");
            return false;
        }

        let rendered = match self.composer.alert_message(freshness) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(error = %e, "Failed to render stale-model alert");
                return false;
            }
        };

        let mail = OutgoingMail {
            to: self.recipients.to_vec(),
            cc: Vec::new(),
            subject: rendered.subject,
            body: rendered.body,
            attachment: None,
        };

        match self.mailer.send(&mail).await {
            Ok(()) => {
                info!(recipients = ?self.recipients, "Stale-model alert sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to send stale-model alert");
                false
            }
        }
    }
}
