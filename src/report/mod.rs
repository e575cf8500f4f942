//! Report workbook generation.

mod builder;

pub use builder::{ReportBuilder, ReportFile, XLSX_CONTENT_TYPE};
