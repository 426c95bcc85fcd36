//! Error types for the reconciliation pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`DecodeError`] - fatal, per-file decode errors
//! - [`ExportError`] - export-time errors
//! - [`ReconcileError`] - top-level run errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Row-level problems
//! (malformed rows, unresolved fields) are not errors: see
//! [`crate::parser::RowWarning`].

use thiserror::Error;

use crate::models::FileRole;
use crate::progress::{Cancelled, Stage};

// =============================================================================
// Decode Errors
// =============================================================================

/// Fatal errors while decoding one input file.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Delimited text could not be tokenized.
    #[error("Invalid delimited text: {0}")]
    Csv(String),

    /// Spreadsheet container could not be opened or read.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// No header row at all.
    #[error("No header row found")]
    NoHeaders,

    /// Header row present but zero data rows.
    #[error("File has a header row but no data rows")]
    EmptyDataset,

    /// Spreadsheet without any sheet.
    #[error("Spreadsheet contains no sheets")]
    NoSheets,

    /// Cancellation observed at a chunk boundary.
    #[error("Decode cancelled")]
    Cancelled,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a record sequence for download.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export.
    #[error("Nothing to export")]
    EmptyExport,

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error while flushing the output buffer.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook writer error.
    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

// =============================================================================
// Reconciliation Errors (top-level)
// =============================================================================

/// Top-level reconciliation run errors.
///
/// This is the error type returned by [`crate::transform::pipeline::reconcile`].
/// A decode failure aborts the whole run and names the offending file.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// One of the two input files could not be decoded.
    #[error("{role} file '{file_name}': {source}")]
    Decode {
        role: FileRole,
        file_name: String,
        #[source]
        source: DecodeError,
    },

    /// The run was cancelled between chunks.
    #[error("Reconciliation cancelled during {0}")]
    Cancelled(Stage),
}

impl ReconcileError {
    /// Wrap a decode error with the file it came from.
    ///
    /// A decode cancellation is reported as a run cancellation.
    pub fn decode(role: FileRole, file_name: impl Into<String>, source: DecodeError) -> Self {
        match source {
            DecodeError::Cancelled => ReconcileError::Cancelled(role.decode_stage()),
            source => ReconcileError::Decode {
                role,
                file_name: file_name.into(),
                source,
            },
        }
    }
}

impl From<Cancelled> for ReconcileError {
    fn from(cancelled: Cancelled) -> Self {
        ReconcileError::Cancelled(cancelled.0)
    }
}

impl From<Cancelled> for DecodeError {
    fn from(_: Cancelled) -> Self {
        DecodeError::Cancelled
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reconciliation error.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for reconciliation runs.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
