//! Manager model and address validation.
//!
//! This module defines the [`Manager`] struct, one row of the roster, and
//! the basic email syntax check every recipient must pass.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Returns true if `address` matches the basic email syntax.
///
/// # Example
///
/// ```
/// use team_reports::models::is_valid_email;
///
/// assert!(is_valid_email("ana@x.com"));
/// assert!(!is_valid_email("ana@x"));
/// ```
pub fn is_valid_email(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address)
}

/// A report recipient and the team whose orders they receive.
///
/// # Example
///
/// ```
/// use team_reports::models::Manager;
///
/// let manager = Manager::new(200, "Ana", "ana@x.com");
/// assert_eq!(manager.team_code, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    /// Team code; unique within a validated roster.
    pub team_code: i64,
    /// Manager display name.
    pub name: String,
    /// Lower-cased, syntactically valid address.
    pub email: String,
}

impl Manager {
    /// Creates a manager record.
    pub fn new(team_code: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            team_code,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns a file-name-safe version of the manager's name.
    ///
    /// ```
    /// use team_reports::models::Manager;
    ///
    /// let manager = Manager::new(200, "Ana Souza / Norte", "ana@x.com");
    /// assert_eq!(manager.file_safe_name(), "Ana_Souza___Norte");
    /// ```
    pub fn file_safe_name(&self) -> String {
        self.name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}
