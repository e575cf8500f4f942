//! Daily per-team order reports.
//!
//! This crate checks that the Power BI semantic model was refreshed today,
//! pulls each team's current orders, splits them into invoiced and pending
//! sheets of a spreadsheet, and emails the workbook to the team's manager.

#![warn(missing_docs)]

pub mod bi;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod scheduler;
pub mod transform;
pub mod validation;
