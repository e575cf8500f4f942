//! Two-sheet spreadsheet report for one manager.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::ToPrimitive;
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{ColumnSpec, ReportConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Manager, OrderRecord, Segment, SegmentTotals, SegmentedReport};

/// MIME type of the generated workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Number format applied to order date cells.
const DATE_FORMAT: &str = "dd/mm/yyyy";

/// A report written to a temporary file.
///
/// The file is removed when the value is dropped, so every exit path of a
/// manager's processing cleans up after itself.
#[derive(Debug)]
pub struct ReportFile {
    file: NamedTempFile,
    attachment_name: String,
}

impl ReportFile {
    /// Location of the temporary workbook.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name to use when attaching the workbook to an email.
    pub fn attachment_name(&self) -> &str {
        &self.attachment_name
    }

    /// Reads the workbook back into memory.
    pub fn read_bytes(&self) -> PipelineResult<Vec<u8>> {
        fs::read(self.path()).map_err(|e| io_error(self.path(), e))
    }

    /// Deletes the temporary file now, logging instead of failing if the
    /// removal does not succeed.
    pub fn close(self) {
        let path = self.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!(path = %path.display(), "Temporary report removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temporary report"),
        }
    }
}

/// Writes segmented reports as two-sheet workbooks.
///
/// Each sheet carries a bold header row with an autofilter, the segment's
/// records, and a summary block with the record count and value total.
pub struct ReportBuilder<'a> {
    config: &'a ReportConfig,
    columns: &'a [ColumnSpec],
    temp_dir: PathBuf,
}

impl<'a> ReportBuilder<'a> {
    /// Creates a builder writing into `temp_dir`.
    pub fn new(config: &'a ReportConfig, columns: &'a [ColumnSpec], temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            columns,
            temp_dir: temp_dir.into(),
        }
    }

    /// Attachment file name for `manager`.
    pub fn attachment_name(&self, manager: &Manager) -> String {
        format!(
            "{}_{}_{}.xlsx",
            self.config.file_prefix,
            manager.team_code,
            manager.file_safe_name()
        )
    }

    /// Builds the workbook for `manager` and writes it to a temporary file.
    ///
    /// Empty segments still get a sheet with headers and a zero summary.
    pub fn build(&self, manager: &Manager, report: &SegmentedReport) -> PipelineResult<ReportFile> {
        let bytes = self.render(report)?;

        fs::create_dir_all(&self.temp_dir).map_err(|e| io_error(&self.temp_dir, e))?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}_{}_", self.config.file_prefix, manager.team_code))
            .suffix(".xlsx")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| io_error(&self.temp_dir, e))?;
        file.write_all(&bytes)
            .and_then(|()| file.flush())
            .map_err(|e| io_error(file.path(), e))?;

        info!(
            team_code = manager.team_code,
            path = %file.path().display(),
            invoiced = report.invoiced_totals.count,
            pending = report.pending_totals.count,
            "Report built"
        );

        Ok(ReportFile {
            file,
            attachment_name: self.attachment_name(manager),
        })
    }

    /// Renders the workbook into memory.
    pub fn render(&self, report: &SegmentedReport) -> PipelineResult<Vec<u8>> {
        let mut headers: Vec<&str> = self.columns.iter().map(|c| c.header.as_str()).collect();
        headers.extend(report.extra_columns.iter().map(String::as_str));

        let mut workbook = Workbook::new();
        for (segment, sheet_name) in [
            (Segment::Invoiced, &self.config.invoiced_sheet),
            (Segment::Pending, &self.config.pending_sheet),
        ] {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet_name.as_str()).map_err(report_error)?;
            self.write_sheet(
                worksheet,
                &headers,
                &report.extra_columns,
                report.records(segment),
                report.totals(segment),
            )
            .map_err(report_error)?;
        }

        workbook.save_to_buffer().map_err(report_error)
    }

    fn write_sheet(
        &self,
        worksheet: &mut Worksheet,
        headers: &[&str],
        extra_columns: &[String],
        records: &[OrderRecord],
        totals: SegmentTotals,
    ) -> Result<(), XlsxError> {
        let bold = Format::new().set_bold();

        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        for (index, record) in records.iter().enumerate() {
            let row = index as u32 + 1;
            for (col, spec) in self.columns.iter().enumerate() {
                write_field(worksheet, row, col as u16, record, &spec.name)?;
            }
            for (offset, name) in extra_columns.iter().enumerate() {
                if let Some(text) = record.attributes.get(name) {
                    worksheet.write_string(row, (self.columns.len() + offset) as u16, text)?;
                }
            }
        }

        let last_row = records.len() as u32;
        let last_col = headers.len().saturating_sub(1) as u16;
        worksheet.autofilter(0, 0, last_row, last_col)?;
        worksheet.set_freeze_panes(1, 0)?;

        let summary_row = last_row + 2;
        worksheet.write_string_with_format(summary_row, 0, &self.config.count_label, &bold)?;
        worksheet.write_number(summary_row, 1, totals.count as f64)?;
        worksheet.write_string_with_format(summary_row + 1, 0, &self.config.total_label, &bold)?;
        worksheet.write_number(summary_row + 1, 1, totals.sum_value.to_f64().unwrap_or(0.0))?;

        Ok(())
    }
}

fn write_field(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    record: &OrderRecord,
    name: &str,
) -> Result<(), XlsxError> {
    match name {
        "org_unit" => {
            if let Some(unit) = record.org_unit {
                worksheet.write_number(row, col, unit as f64)?;
            }
        }
        "date" => {
            if let Some(date) = record.date {
                let cell = ExcelDateTime::from_ymd(
                    date.year() as u16,
                    date.month() as u8,
                    date.day() as u8,
                )?;
                let format = Format::new().set_num_format(DATE_FORMAT);
                worksheet.write_datetime_with_format(row, col, &cell, &format)?;
            }
        }
        "status" => {
            worksheet.write_string(row, col, &record.status)?;
        }
        "value" => {
            if let Some(value) = record.value.and_then(|v| v.to_f64()) {
                worksheet.write_number(row, col, value)?;
            }
        }
        other => {
            if let Some(text) = record.attributes.get(other) {
                worksheet.write_string(row, col, text)?;
            }
        }
    }
    Ok(())
}

fn report_error(error: XlsxError) -> PipelineError {
    PipelineError::Report {
        message: error.to_string(),
    }
}

fn io_error(path: &Path, error: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
