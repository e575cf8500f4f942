//! Input extraction: the manager roster and per-team orders.

mod orders;
mod roster;

pub use orders::OrderExtractor;
pub use roster::{Roster, RosterEntry, RosterSource, validate_roster};
