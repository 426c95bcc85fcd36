//! Domain models for the reconciliation pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`SourceFile`] / [`SourceFormat`] - An input file and how to decode it
//! - [`RawRow`] - Header-keyed row produced by the decoder
//! - [`WebRecord`] - One row of the WEB sales export
//! - [`AccountingRecord`] - One row of the accounting (QBO) export
//! - [`ReconciliationRecord`] - One matched pair, the output unit
//! - [`FileSummary`] - Diagnostic data about a decoded file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::progress::Stage;

// =============================================================================
// Source files
// =============================================================================

/// Which of the two extracts a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Web,
    Accounting,
}

impl FileRole {
    /// Progress stage used while decoding a file of this role.
    pub fn decode_stage(&self) -> Stage {
        match self {
            FileRole::Web => Stage::DecodingWeb,
            FileRole::Accounting => Stage::DecodingAccounting,
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRole::Web => f.write_str("web"),
            FileRole::Accounting => f.write_str("accounting"),
        }
    }
}

/// Declared container format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFormat {
    /// Delimited text (CSV, TSV, semicolon...).
    DelimitedText,
    /// Binary spreadsheet (xlsx, xls, xlsb, ods).
    Spreadsheet,
}

impl SourceFormat {
    /// Pick a format from the file name, falling back to magic bytes.
    pub fn detect(file_name: Option<&str>, bytes: &[u8]) -> Self {
        let ext = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") | Some("tsv") | Some("txt") => SourceFormat::DelimitedText,
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => {
                SourceFormat::Spreadsheet
            }
            _ => Self::sniff(bytes),
        }
    }

    fn sniff(bytes: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE2: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
        if bytes.starts_with(ZIP) || bytes.starts_with(OLE2) {
            SourceFormat::Spreadsheet
        } else {
            SourceFormat::DelimitedText
        }
    }
}

/// An input file held in memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a source file, detecting its format.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let format = SourceFormat::detect(Some(&name), &bytes);
        Self { name, format, bytes }
    }

    /// Create a source file with an explicit format.
    pub fn with_format(name: impl Into<String>, format: SourceFormat, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            bytes,
        }
    }

    /// Read a file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

// =============================================================================
// Raw rows
// =============================================================================

/// Ordered mapping from canonical header key to raw cell text.
///
/// Only lives between the decoder and the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Insert a cell. A repeated key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    /// Value for a canonical key, if the column exists.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }
}

// =============================================================================
// Canonical records
// =============================================================================

/// One row of the WEB sales export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRecord {
    pub doc_number: String,
    /// Normalized SKU. Empty when no SKU column resolved.
    pub sku: String,
    pub product_name: String,
    pub qty: i64,
}

/// Accounting sales document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocType {
    #[default]
    Invoice,
    #[serde(rename = "Sale Receipts")]
    SaleReceipt,
    #[serde(rename = "Credit Memo")]
    CreditMemo,
    Estimate,
}

impl DocType {
    /// Parse a free-text document type. Unknown or empty text is an invoice.
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "salereceipt" | "salereceipts" | "salesreceipt" | "salesreceipts" => {
                DocType::SaleReceipt
            }
            "creditmemo" | "creditmemos" => DocType::CreditMemo,
            "estimate" | "estimates" => DocType::Estimate,
            _ => DocType::Invoice,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocType::Invoice => "Invoice",
            DocType::SaleReceipt => "Sale Receipts",
            DocType::CreditMemo => "Credit Memo",
            DocType::Estimate => "Estimate",
        }
    }
}

/// One row of the accounting sales-document export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingRecord {
    pub id: String,
    pub date: String,
    pub doc_type: DocType,
    pub doc_number: String,
    pub customer: String,
    /// Normalized SKU, same rule as [`WebRecord::sku`].
    pub sku: String,
    /// Product/service label, possibly `Category:Name`.
    pub product_label: String,
    pub description: String,
    pub qty: i64,
    pub ship_to: String,
}

impl AccountingRecord {
    /// Product name with any leading `category:` segment removed.
    pub fn product_name(&self) -> String {
        strip_category(&self.product_label)
    }
}

/// `"Category:Wireless Mouse"` -> `"Wireless Mouse"`.
///
/// Everything after the first `:` is kept (later colons included) and
/// trimmed. A label without `:` is returned unchanged.
pub fn strip_category(label: &str) -> String {
    match label.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => label.to_string(),
    }
}

/// One matched WEB/accounting pair.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub sku: String,
    #[serde(rename = "webName")]
    pub web_product_name: String,
    #[serde(rename = "qboName")]
    pub accounting_product_name: String,
    #[serde(rename = "qboDescription")]
    pub accounting_description: String,
}

impl ReconciliationRecord {
    /// Pair an accounting row with its WEB counterpart.
    pub fn pair(accounting: &AccountingRecord, web: &WebRecord) -> Self {
        Self {
            sku: accounting.sku.clone(),
            web_product_name: web.product_name.clone(),
            accounting_product_name: accounting.product_name(),
            accounting_description: accounting.description.clone(),
        }
    }
}

// =============================================================================
// File summary
// =============================================================================

/// Diagnostic data about one decoded file, for preview displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub file_name: String,
    pub format: SourceFormat,
    /// Data rows kept (malformed and blank rows excluded).
    pub row_count: usize,
    /// Original header texts, trimmed, in column order.
    pub headers: Vec<String>,
    /// First rows, cells aligned with `headers`.
    pub preview: Vec<Vec<String>>,
    pub malformed_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

// =============================================================================
// Tests
// =============================================================================
