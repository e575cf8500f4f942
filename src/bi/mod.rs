//! Business-intelligence access.
//!
//! This module holds the [`QueryExecutor`] seam, its Power BI implementation
//! and the DAX queries the pipeline sends.

mod client;
mod queries;

pub use client::{PowerBiClient, QueryExecutor};
pub use queries::{LAST_REFRESH_COLUMN, last_refresh_query, orders_by_team};
