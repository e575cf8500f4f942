//! Email composition, routing and delivery.
//!
//! Messages are rendered from Tera templates, addressed through the routing
//! rules and handed to a [`MailTransport`]. The SMTP implementation lives in
//! [`SmtpMailer`].

mod mail;
mod routing;
mod service;
mod templates;

pub use mail::{Attachment, MailTransport, OutgoingMail, SmtpMailer};
pub use routing::{Recipients, Router};
pub use service::{AlertNotifier, ReportDelivery};
pub use templates::{MessageComposer, RenderedMessage};
