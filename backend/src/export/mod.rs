//! Exporter for reconciliation results.
//!
//! Serializes a record sequence to delimited text or to a single-sheet
//! workbook. Column order is the record's declaration order.

use chrono::Local;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ExportError, ExportResult};
use crate::models::ReconciliationRecord;

/// Worksheet name used by [`export_xlsx`].
pub const SHEET_NAME: &str = "Reconciliation";

/// A flat record with a fixed column list.
pub trait ExportRow {
    /// Header names, in declaration order.
    fn columns() -> &'static [&'static str];

    /// Cell values, aligned with [`ExportRow::columns`].
    fn cells(&self) -> Vec<&str>;
}

impl ExportRow for ReconciliationRecord {
    fn columns() -> &'static [&'static str] {
        &["sku", "webName", "qboName", "qboDescription"]
    }

    fn cells(&self) -> Vec<&str> {
        vec![
            self.sku.as_str(),
            self.web_product_name.as_str(),
            self.accounting_product_name.as_str(),
            self.accounting_description.as_str(),
        ]
    }
}

/// Export format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// Parse `csv` or `xlsx`, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// Serialize `records` in this format.
    pub fn export<R: ExportRow>(&self, records: &[R]) -> ExportResult<Vec<u8>> {
        match self {
            ExportFormat::Csv => export_csv(records),
            ExportFormat::Xlsx => export_xlsx(records),
        }
    }
}

/// Comma-separated text with a header row and `\n` line endings.
///
/// Values are quoted only when they contain a comma, a quote or a line
/// break; inner quotes are doubled.
pub fn export_csv<R: ExportRow>(records: &[R]) -> ExportResult<Vec<u8>> {
    if records.is_empty() {
        return Err(ExportError::EmptyExport);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(R::columns())?;
    for record in records {
        writer.write_record(record.cells())?;
    }
    writer.flush()?;

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Single-sheet workbook with a bold header row.
pub fn export_xlsx<R: ExportRow>(records: &[R]) -> ExportResult<Vec<u8>> {
    if records.is_empty() {
        return Err(ExportError::EmptyExport);
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet().set_name(SHEET_NAME)?;

    for (col, name) in R::columns().iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *name, &header)?;
        worksheet.set_column_width(col, 24)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1).unwrap_or(u32::MAX);
        for (col, value) in record.cells().into_iter().enumerate() {
            worksheet.write_string(row, col as u16, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// `reconciliation_export_YYYY-MM-DD.<ext>` for today's local date.
pub fn default_export_name(extension: &str) -> String {
    format!(
        "reconciliation_export_{}.{}",
        Local::now().format("%Y-%m-%d"),
        extension.trim_start_matches('.')
    )
}
