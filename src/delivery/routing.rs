//! Per-team recipient overrides.

use crate::config::{RoutingMode, RoutingRule};
use crate::models::Manager;

/// Primary and copied recipients of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Copied recipients.
    pub cc: Vec<String>,
}

/// Resolves where a manager's report goes.
///
/// # Example
///
/// ```
/// use team_reports::config::{RoutingMode, RoutingRule};
/// use team_reports::delivery::Router;
/// use team_reports::models::Manager;
///
/// let rules = vec![RoutingRule {
///     team_code: 200,
///     recipient: "admin@x.com".to_string(),
///     mode: RoutingMode::Redirect,
/// }];
/// let router = Router::new(&rules);
///
/// let routed = router.recipients_for(&Manager::new(200, "Ana", "ana@x.com"));
/// assert_eq!(routed.to, vec!["admin@x.com".to_string()]);
///
/// let direct = router.recipients_for(&Manager::new(300, "Bruno", "bruno@x.com"));
/// assert_eq!(direct.to, vec!["bruno@x.com".to_string()]);
/// ```
pub struct Router<'a> {
    rules: &'a [RoutingRule],
}

impl<'a> Router<'a> {
    /// Creates a router over the configured rules.
    pub fn new(rules: &'a [RoutingRule]) -> Self {
        Self { rules }
    }

    /// Recipients for `manager`. The first rule matching the team wins.
    pub fn recipients_for(&self, manager: &Manager) -> Recipients {
        match self.rules.iter().find(|rule| rule.team_code == manager.team_code) {
            Some(rule) if rule.mode == RoutingMode::Redirect => Recipients {
                to: vec![rule.recipient.clone()],
                cc: Vec::new(),
            },
            Some(rule) => Recipients {
                to: vec![manager.email.clone()],
                cc: vec![rule.recipient.clone()],
            },
            None => Recipients {
                to: vec![manager.email.clone()],
                cc: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(team_code: i64, recipient: &str, mode: RoutingMode) -> RoutingRule {
        RoutingRule {
            team_code,
            recipient: recipient.to_string(),
            mode,
        }
    }

    #[test]
    fn test_copy_mode_keeps_manager_and_copies_override() {
        let rules = vec![rule(200, "admin@x.com", RoutingMode::Copy)];
        let recipients = Router::new(&rules).recipients_for(&Manager::new(200, "Ana", "ana@x.com"));

        assert_eq!(recipients.to, vec!["ana@x.com".to_string()]);
        assert_eq!(recipients.cc, vec!["admin@x.com".to_string()]);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            rule(200, "first@x.com", RoutingMode::Redirect),
            rule(200, "second@x.com", RoutingMode::Copy),
        ];
        let recipients = Router::new(&rules).recipients_for(&Manager::new(200, "Ana", "ana@x.com"));

        assert_eq!(recipients.to, vec!["first@x.com".to_string()]);
        assert!(recipients.cc.is_empty());
    }

    #[test]
    fn test_no_rules_sends_to_manager() {
        let recipients = Router::new(&[]).recipients_for(&Manager::new(1, "A", "a@x.com"));
        assert_eq!(recipients.to, vec!["a@x.com".to_string()]);
        assert!(recipients.cc.is_empty());
    }
}
