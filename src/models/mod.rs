//! Core data models for the reports pipeline.
//!
//! This module contains the domain models passed between components.

mod manager;
mod order;
mod statistics;

pub use manager::{Manager, is_valid_email};
pub use order::{DataQuality, OrderRecord, RawRow, Segment, SegmentTotals, SegmentedReport};
pub use statistics::{ManagerFailure, RunStatistics, Stage};
