//! Pre-run validation gates.

mod freshness;

pub use freshness::{FreshnessReport, FreshnessStatus, FreshnessValidator};
