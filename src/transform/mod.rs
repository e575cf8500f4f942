//! Data transformation for order rows.
//!
//! This module normalizes BI column names to the internal naming scheme,
//! coerces cell types and partitions orders into invoiced and pending
//! segments.

mod coerce;
mod transformer;

pub use coerce::{parse_date, parse_decimal, parse_integer, to_text};
pub use transformer::{Transformer, clean_column_name, partition_by_status};
