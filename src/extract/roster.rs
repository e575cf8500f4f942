//! Manager roster loading and validation.

use std::collections::HashSet;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{info, warn};

use crate::config::RosterConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Manager, is_valid_email};

/// One roster row before validation. Cells that were blank or could not be
/// read are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterEntry {
    /// Team code cell, when it holds a whole number.
    pub team_code: Option<i64>,
    /// Manager name cell.
    pub name: Option<String>,
    /// Email cell.
    pub email: Option<String>,
}

/// The validated roster and what validation removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Managers in roster order, unique by team code.
    pub managers: Vec<Manager>,
    /// Rows dropped for a blank or non-numeric critical cell.
    pub dropped_incomplete: usize,
    /// Rows dropped for an address that fails the syntax check.
    pub dropped_invalid_email: usize,
    /// Rows dropped because an earlier row already claimed the team code.
    pub dropped_duplicates: usize,
}

impl Roster {
    /// Total rows removed by validation.
    pub fn dropped(&self) -> usize {
        self.dropped_incomplete + self.dropped_invalid_email + self.dropped_duplicates
    }

    /// Keeps only managers whose team is in `teams`.
    pub fn retain_teams(&mut self, teams: &[i64]) {
        self.managers
            .retain(|manager| teams.contains(&manager.team_code));
    }
}

/// Validates raw roster rows.
///
/// Rows missing a team code, name or email are dropped first. Emails are
/// trimmed and lower-cased, then rows with invalid addresses are dropped.
/// Finally duplicates are removed, keeping the first row for each team code.
///
/// # Example
///
/// ```
/// use team_reports::extract::{RosterEntry, validate_roster};
///
/// let entry = |team: i64, email: &str| RosterEntry {
///     team_code: Some(team),
///     name: Some("Ana".to_string()),
///     email: Some(email.to_string()),
/// };
/// let roster = validate_roster(vec![entry(200, " Ana@X.com "), entry(200, "b@x.com")]);
///
/// assert_eq!(roster.managers.len(), 1);
/// assert_eq!(roster.managers[0].email, "ana@x.com");
/// assert_eq!(roster.dropped_duplicates, 1);
/// ```
pub fn validate_roster(entries: Vec<RosterEntry>) -> Roster {
    let mut roster = Roster::default();
    let mut seen = HashSet::new();

    for entry in entries {
        let (Some(team_code), Some(name), Some(email)) = (entry.team_code, entry.name, entry.email)
        else {
            roster.dropped_incomplete += 1;
            continue;
        };

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            warn!(team_code, email = %email, "Dropping roster row with invalid email");
            roster.dropped_invalid_email += 1;
            continue;
        }

        if !seen.insert(team_code) {
            warn!(team_code, "Dropping duplicate roster row");
            roster.dropped_duplicates += 1;
            continue;
        }

        roster
            .managers
            .push(Manager::new(team_code, name.trim(), email));
    }

    roster
}

/// Reads the roster workbook described by a [`RosterConfig`].
pub struct RosterSource<'a> {
    config: &'a RosterConfig,
}

impl<'a> RosterSource<'a> {
    /// Creates a source for the configured workbook.
    pub fn new(config: &'a RosterConfig) -> Self {
        Self { config }
    }

    /// Loads and validates the roster, optionally restricted to `teams`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RosterNotFound`] if the file does not exist
    /// - [`PipelineError::RosterUnreadable`] if it is not a readable workbook
    /// - [`PipelineError::RosterMissingColumns`] if the header lacks a
    ///   configured column
    pub fn load(&self, teams: Option<&[i64]>) -> PipelineResult<Roster> {
        let path = self.config.path.as_path();
        let entries = self.read_entries(path)?;
        let total = entries.len();

        let mut roster = validate_roster(entries);
        if let Some(teams) = teams {
            roster.retain_teams(teams);
            info!(teams = ?teams, kept = roster.managers.len(), "Roster filtered by team");
        }

        info!(
            path = %path.display(),
            rows = total,
            managers = roster.managers.len(),
            dropped_incomplete = roster.dropped_incomplete,
            dropped_invalid_email = roster.dropped_invalid_email,
            dropped_duplicates = roster.dropped_duplicates,
            "Roster loaded"
        );
        Ok(roster)
    }

    fn read_entries(&self, path: &Path) -> PipelineResult<Vec<RosterEntry>> {
        if !path.exists() {
            return Err(PipelineError::RosterNotFound {
                path: path.display().to_string(),
            });
        }

        let unreadable = |message: String| PipelineError::RosterUnreadable {
            path: path.display().to_string(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unreadable("workbook has no worksheets".to_string()))?
            .map_err(|e| unreadable(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<Option<String>> = rows
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();

        let position = |name: &str| {
            header
                .iter()
                .position(|cell| cell.as_deref() == Some(name))
        };

        let columns = [
            &self.config.team_code_column,
            &self.config.manager_name_column,
            &self.config.email_column,
        ];
        let positions = columns.map(|name| position(name.as_str()));

        let [Some(team_col), Some(name_col), Some(email_col)] = positions else {
            let missing = columns
                .iter()
                .zip(positions)
                .filter(|(_, found)| found.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(PipelineError::RosterMissingColumns { missing });
        };

        Ok(rows
            .map(|cells| RosterEntry {
                team_code: cells.get(team_col).and_then(cell_integer),
                name: cells.get(name_col).and_then(cell_text),
                email: cells.get(email_col).and_then(cell_text),
            })
            .collect())
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::String(text) => text.trim().to_string(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        Data::Float(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

fn cell_integer(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(value) => Some(*value),
        Data::Float(value) if value.fract() == 0.0 => Some(*value as i64),
        Data::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(team: Option<i64>, name: Option<&str>, email: Option<&str>) -> RosterEntry {
        RosterEntry {
            team_code: team,
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let roster = validate_roster(vec![
            entry(None, Some("Ana"), Some("ana@x.com")),
            entry(Some(200), None, Some("ana@x.com")),
            entry(Some(200), Some("Ana"), None),
            entry(Some(300), Some("Bruno"), Some("bruno@x.com")),
        ]);

        assert_eq!(roster.dropped_incomplete, 3);
        assert_eq!(roster.managers, vec![Manager::new(300, "Bruno", "bruno@x.com")]);
    }

    #[test]
    fn test_invalid_emails_are_dropped_after_normalization() {
        let roster = validate_roster(vec![
            entry(Some(200), Some("Ana"), Some("  ANA@X.COM ")),
            entry(Some(300), Some("Bruno"), Some("bruno@x")),
        ]);

        assert_eq!(roster.dropped_invalid_email, 1);
        assert_eq!(roster.managers[0].email, "ana@x.com");
    }

    #[test]
    fn test_duplicate_teams_keep_first_valid_row() {
        let roster = validate_roster(vec![
            entry(Some(200), Some("Ana"), Some("not-an-email")),
            entry(Some(200), Some("Carla"), Some("carla@x.com")),
            entry(Some(200), Some("Dora"), Some("dora@x.com")),
        ]);

        assert_eq!(roster.managers, vec![Manager::new(200, "Carla", "carla@x.com")]);
        assert_eq!(roster.dropped_invalid_email, 1);
        assert_eq!(roster.dropped_duplicates, 1);
        assert_eq!(roster.dropped(), 2);
    }

    #[test]
    fn test_retain_teams_filters_in_order() {
        let mut roster = validate_roster(vec![
            entry(Some(100), Some("A"), Some("a@x.com")),
            entry(Some(200), Some("B"), Some("b@x.com")),
            entry(Some(300), Some("C"), Some("c@x.com")),
        ]);
        roster.retain_teams(&[300, 100]);

        let teams: Vec<i64> = roster.managers.iter().map(|m| m.team_code).collect();
        assert_eq!(teams, vec![100, 300]);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let config = RosterConfig {
            path: "/nonexistent/managers.xlsx".into(),
            ..RosterConfig::default()
        };
        let result = RosterSource::new(&config).load(None);
        assert!(matches!(result, Err(PipelineError::RosterNotFound { .. })));
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(cell_integer(&Data::Float(200.0)), Some(200));
        assert_eq!(cell_integer(&Data::Float(200.5)), None);
        assert_eq!(cell_integer(&Data::String(" 300 ".to_string())), Some(300));
        assert_eq!(cell_integer(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  ".to_string())), None);
        assert_eq!(cell_text(&Data::Float(42.0)), Some("42".to_string()));
    }

    proptest! {
        #[test]
        fn prop_validated_roster_has_unique_valid_managers(
            rows in prop::collection::vec(
                (prop::option::of(0i64..20), prop::option::of("[a-z]{1,8}"), prop::option::of("[a-z]{1,6}@(x\\.com|bad)")),
                0..40,
            )
        ) {
            let entries: Vec<RosterEntry> = rows
                .into_iter()
                .map(|(team_code, name, email)| RosterEntry { team_code, name, email })
                .collect();
            let total = entries.len();
            let roster = validate_roster(entries);

            let mut seen = HashSet::new();
            for manager in &roster.managers {
                prop_assert!(is_valid_email(&manager.email));
                prop_assert!(seen.insert(manager.team_code));
            }
            prop_assert_eq!(roster.managers.len() + roster.dropped(), total);
        }
    }
}
