//! Outgoing messages and the mail transport seam.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpLogin;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::{SmtpConfig, SmtpCredentials};
use crate::error::{PipelineError, PipelineResult};

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub content: Vec<u8>,
}

/// A fully rendered email, independent of any transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Copied recipients.
    pub cc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Optional attachment.
    pub attachment: Option<Attachment>,
}

impl OutgoingMail {
    /// Every recipient address, primary first.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(self.cc.iter()).map(String::as_str)
    }
}

/// Something that can deliver an [`OutgoingMail`].
///
/// Implementations open a fresh session for every call to
/// [`send`](MailTransport::send); retries are the caller's concern.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Delivers one message.
    async fn send(&self, mail: &OutgoingMail) -> PipelineResult<()>;

    /// Opens a session and authenticates without sending anything.
    async fn test_connection(&self) -> PipelineResult<()>;
}

/// [`MailTransport`] over authenticated SMTP with TLS.
///
/// Port 465 uses implicit TLS; any other port negotiates STARTTLS.
pub struct SmtpMailer {
    host: String,
    port: u16,
    sender: Mailbox,
    credentials: SmtpCredentials,
}

impl SmtpMailer {
    /// Creates a mailer for the configured relay.
    pub fn new(config: &SmtpConfig, credentials: &SmtpCredentials) -> PipelineResult<Self> {
        let address = config.sender.parse().map_err(|e| PipelineError::InvalidConfig {
            field: "smtp.sender".to_string(),
            message: format!("{}", e),
        })?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            sender: Mailbox::new(config.sender_name.clone(), address),
            credentials: credentials.clone(),
        })
    }

    fn transport(&self) -> PipelineResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = if self.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
        }
        .map_err(classify_smtp_error)?;

        Ok(builder
            .port(self.port)
            .credentials(SmtpLogin::new(
                self.credentials.username.clone(),
                self.credentials.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }

    fn to_message(&self, mail: &OutgoingMail) -> PipelineResult<Message> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(mail.subject.clone());
        for address in &mail.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &mail.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }

        let text = SinglePart::plain(mail.body.clone());
        let message = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| compose_error(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed().singlepart(text).singlepart(
                        MimeAttachment::new(attachment.filename.clone())
                            .body(attachment.content.clone(), content_type),
                    ),
                )
            }
            None => builder.singlepart(text),
        };
        message.map_err(|e| compose_error(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> PipelineResult<()> {
        let message = self.to_message(mail)?;
        let transport = self.transport()?;

        debug!(host = %self.host, port = self.port, "Opening SMTP session");
        transport
            .send(message)
            .await
            .map_err(classify_smtp_error)?;

        info!(to = ?mail.to, cc = ?mail.cc, subject = %mail.subject, "Email sent");
        Ok(())
    }

    async fn test_connection(&self) -> PipelineResult<()> {
        let transport = self.transport()?;
        let connected = transport
            .test_connection()
            .await
            .map_err(classify_smtp_error)?;
        if connected {
            info!(host = %self.host, port = self.port, "SMTP server reachable");
            Ok(())
        } else {
            Err(PipelineError::MailTransport {
                message: format!("{}:{} refused the connection", self.host, self.port),
            })
        }
    }
}

fn parse_mailbox(address: &str) -> PipelineResult<Mailbox> {
    address
        .parse()
        .map_err(|e| compose_error(format!("invalid address '{}': {}", address, e)))
}

fn compose_error(message: String) -> PipelineError {
    PipelineError::MailCompose { message }
}

/// Maps an SMTP failure: rejected logins and permanent refusals are final,
/// everything else is treated as transient.
fn classify_smtp_error(error: lettre::transport::smtp::Error) -> PipelineError {
    let code = error.status().map(|code| code.to_string());
    let message = error.to_string();
    match code.as_deref() {
        Some("530" | "534" | "535") => PipelineError::SmtpAuthentication { message },
        _ if error.is_permanent() => PipelineError::MailRejected { message },
        _ => PipelineError::MailTransport { message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        let config = SmtpConfig {
            sender_name: Some("Reports".to_string()),
            ..SmtpConfig::default()
        };
        let credentials = SmtpCredentials {
            username: "reports@example.com".to_string(),
            password: "secret".to_string(),
        };
        SmtpMailer::new(&config, &credentials).unwrap()
    }

    fn mail() -> OutgoingMail {
        OutgoingMail {
            to: vec!["ana@x.com".to_string()],
            cc: vec!["admin@x.com".to_string()],
            subject: "Order report - Team 200 - Ana".to_string(),
            body: "Dear Ana".to_string(),
            attachment: None,
        }
    }

    #[test]
    fn test_message_carries_headers() {
        let message = mailer().to_message(&mail()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("To: ana@x.com"));
        assert!(formatted.contains("Cc: admin@x.com"));
        assert!(formatted.contains("From: Reports <reports@example.com>"));
        assert!(formatted.contains("Subject: Order report - Team 200 - Ana"));
    }

    #[test]
    fn test_message_with_attachment_is_multipart() {
        let mut mail = mail();
        mail.attachment = Some(Attachment {
            filename: "report_team_200_Ana.xlsx".to_string(),
            content_type: crate::report::XLSX_CONTENT_TYPE.to_string(),
            content: vec![1, 2, 3],
        });
        let message = mailer().to_message(&mail).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).to_string();

        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("report_team_200_Ana.xlsx"));
    }

    #[test]
    fn test_invalid_recipient_fails_composition() {
        let mut mail = mail();
        mail.to = vec!["not an address".to_string()];
        let result = mailer().to_message(&mail);
        assert!(matches!(result, Err(PipelineError::MailCompose { .. })));
    }

    #[test]
    fn test_invalid_sender_is_config_error() {
        let config = SmtpConfig {
            sender: "nobody".to_string(),
            ..SmtpConfig::default()
        };
        let credentials = SmtpCredentials {
            username: String::new(),
            password: String::new(),
        };
        let result = SmtpMailer::new(&config, &credentials);
        assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_recipients_lists_to_then_cc() {
        let mail = mail();
        let recipients: Vec<&str> = mail.recipients().collect();
        assert_eq!(recipients, vec!["ana@x.com", "admin@x.com"]);
    }
}
