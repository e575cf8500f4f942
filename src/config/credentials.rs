//! Secrets read once at process start.

use std::fmt;

use crate::error::{PipelineError, PipelineResult};

/// Client-credential secrets for the BI tenant.
#[derive(Clone)]
pub struct BiCredentials {
    /// Azure AD tenant.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Application secret.
    pub client_secret: String,
    /// Power BI workspace (group) id.
    pub workspace_id: String,
    /// Semantic model (dataset) id.
    pub semantic_model_id: String,
}

/// SMTP login.
#[derive(Clone)]
pub struct SmtpCredentials {
    /// Login name, usually the sender address.
    pub username: String,
    /// App password.
    pub password: String,
}

/// Every secret the pipeline needs.
#[derive(Clone)]
pub struct Credentials {
    /// BI tenant secrets.
    pub bi: BiCredentials,
    /// Mail server login.
    pub smtp: SmtpCredentials,
}

impl Credentials {
    /// Reads all secrets from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingCredential`] naming the first unset
    /// or empty variable.
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads all secrets through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| -> PipelineResult<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PipelineError::MissingCredential {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            bi: BiCredentials {
                tenant_id: get("TENANT_ID")?,
                client_id: get("CLIENT_ID")?,
                client_secret: get("CLIENT_SECRET")?,
                workspace_id: get("WORKSPACE_ID")?,
                semantic_model_id: get("SEMANTIC_MODEL_ID")?,
            },
            smtp: SmtpCredentials {
                username: get("SMTP_USERNAME")?,
                password: get("SMTP_PASSWORD")?,
            },
        })
    }
}

impl fmt::Debug for BiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("workspace_id", &self.workspace_id)
            .field("semantic_model_id", &self.semantic_model_id)
            .finish()
    }
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bi", &self.bi)
            .field("smtp", &self.smtp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TENANT_ID", "tenant"),
            ("CLIENT_ID", "client"),
            ("CLIENT_SECRET", "s3cret"),
            ("WORKSPACE_ID", "ws"),
            ("SEMANTIC_MODEL_ID", "model"),
            ("SMTP_USERNAME", "reports@example.com"),
            ("SMTP_PASSWORD", "app-password"),
        ])
    }

    #[test]
    fn test_reads_every_secret() {
        let env = full_env();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(creds.bi.tenant_id, "tenant");
        assert_eq!(creds.bi.semantic_model_id, "model");
        assert_eq!(creds.smtp.username, "reports@example.com");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let mut env = full_env();
        env.remove("CLIENT_SECRET");
        let result = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        match result {
            Err(PipelineError::MissingCredential { name }) => assert_eq!(name, "CLIENT_SECRET"),
            other => panic!("Expected MissingCredential, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert("SMTP_PASSWORD", "   ");
        let result = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert!(matches!(
            result,
            Err(PipelineError::MissingCredential { name }) if name == "SMTP_PASSWORD"
        ));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let env = full_env();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        let debug = format!("{:?}", creds);

        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("app-password"));
        assert!(debug.contains("<redacted>"));
    }
}
