//! Error types for the team reports pipeline.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the pipeline can hit, from configuration loading to
//! mail delivery.

use thiserror::Error;

/// The main error type for the team reports pipeline.
///
/// Library operations return this error type. The orchestrator decides which
/// of them abort a run and which are isolated to a single manager.
///
/// # Example
///
/// ```
/// use team_reports::error::PipelineError;
///
/// let error = PipelineError::ConfigNotFound {
///     path: "/missing/pipeline.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/pipeline.yaml");
/// ```
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value is present but unusable.
    #[error("Invalid configuration value '{field}': {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A required secret was not present in the environment.
    #[error("Missing credential: {name}")]
    MissingCredential {
        /// The environment variable name.
        name: String,
    },

    /// The roster spreadsheet does not exist.
    #[error("Roster file not found: {path}")]
    RosterNotFound {
        /// The roster path.
        path: String,
    },

    /// The roster spreadsheet exists but could not be read.
    #[error("Failed to read roster '{path}': {message}")]
    RosterUnreadable {
        /// The roster path.
        path: String,
        /// A description of the read error.
        message: String,
    },

    /// The roster header lacks one or more required columns.
    #[error("Roster is missing required columns: {}", missing.join(", "))]
    RosterMissingColumns {
        /// Every required column that was not found.
        missing: Vec<String>,
    },

    /// The identity provider rejected the client credentials.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// The provider's explanation.
        message: String,
    },

    /// A request never produced an HTTP response.
    #[error("Network error: {message}")]
    Network {
        /// A description of the transport failure.
        message: String,
    },

    /// The BI API answered with a non-success status.
    #[error("BI API returned status {status}: {message}")]
    ApiStatus {
        /// The HTTP status code.
        status: u16,
        /// The (truncated) response body.
        message: String,
    },

    /// The BI API answered with a body that does not have the expected shape.
    #[error("Unexpected query response: {message}")]
    QueryResponse {
        /// What was wrong with the body.
        message: String,
    },

    /// Raw order rows could not be reshaped into a segmented report.
    #[error("Transform error: {message}")]
    Transform {
        /// A description of the transform failure.
        message: String,
    },

    /// The report spreadsheet could not be written.
    #[error("Failed to build report: {message}")]
    Report {
        /// A description of the writer failure.
        message: String,
    },

    /// A template could not be rendered.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// The template name.
        template: String,
        /// The renderer's explanation.
        message: String,
    },

    /// An email message could not be assembled.
    #[error("Failed to compose email: {message}")]
    MailCompose {
        /// A description of the composition failure.
        message: String,
    },

    /// The mail server rejected the login.
    #[error("SMTP authentication failed: {message}")]
    SmtpAuthentication {
        /// The server's explanation.
        message: String,
    },

    /// The mail server permanently refused the message.
    #[error("Mail rejected: {message}")]
    MailRejected {
        /// The server's explanation.
        message: String,
    },

    /// The mail session failed for a reason other than authentication.
    #[error("SMTP transport error: {message}")]
    MailTransport {
        /// A description of the transport failure.
        message: String,
    },

    /// A retried operation failed on every attempt.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The operation that was retried.
        operation: String,
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },

    /// A file-system operation failed.
    #[error("I/O error on '{path}': {message}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying error.
        message: String,
    },
}

impl PipelineError {
    /// Returns true when the failure is transient and worth another attempt.
    ///
    /// Network failures, SMTP transport failures and the HTTP statuses that
    /// signal an expired token, throttling or a server-side fault are
    /// retryable. Everything else fails the operation immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Network { .. } | PipelineError::MailTransport { .. } => true,
            PipelineError::ApiStatus { status, .. } => {
                matches!(*status, 401 | 408 | 429) || *status >= 500
            }
            _ => false,
        }
    }
}

/// A type alias for Results that return PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;
