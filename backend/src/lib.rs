//! # skurecon - WEB vs accounting SKU reconciliation
//!
//! skurecon ingests a WEB sales export and an accounting (QBO)
//! sales-document export, normalizes their column schemas and joins them
//! on a normalized SKU.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  WEB file   │────▶│   Decoder   │────▶│  Normalizer │────▶│  SKU index  │──┐
//! │ (CSV/XLSX)  │     │ (auto-enc)  │     │  (aliases)  │     │ (last wins) │  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘  │
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐  │
//! │  QBO file   │────▶│   Decoder   │────▶│  Normalizer │────▶│    Join     │◀─┘
//! │ (CSV/XLSX)  │     │ (auto-enc)  │     │  (aliases)  │     │ (inner)     │──▶ Export
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skurecon::{reconcile, CancelFlag, NoProgress, ReconcileOptions, SourceFile};
//!
//! #[tokio::main]
//! async fn main() {
//!     let web = SourceFile::from_path("web.csv").unwrap();
//!     let qbo = SourceFile::from_path("qbo.csv").unwrap();
//!     let report = reconcile(&web, &qbo, &ReconcileOptions::default(), &NoProgress, &CancelFlag::new())
//!         .await
//!         .unwrap();
//!     println!("Matched {} records", report.records.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (WebRecord, AccountingRecord, ReconciliationRecord)
//! - [`progress`] - Stage tags, progress sinks, cancellation
//! - [`parser`] - CSV / spreadsheet decoding with auto-detection
//! - [`transform`] - Normalizer, index, join and pipeline
//! - [`export`] - CSV / XLSX export
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod progress;

// Decoding
pub mod parser;

// Reconciliation
pub mod transform;

// Export
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{DecodeError, ExportError, ReconcileError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AccountingRecord, DocType, FileRole, FileSummary, RawRow, ReconciliationRecord, SourceFile,
    SourceFormat, WebRecord,
};

// =============================================================================
// Re-exports - Progress
// =============================================================================

pub use progress::{CancelFlag, Cancelled, NoProgress, ProgressSink, Stage};

// =============================================================================
// Re-exports - Decoding
// =============================================================================

pub use parser::{
    canonicalize_header, decode, decode_content, detect_delimiter, detect_encoding, DecodedFile,
    RowWarning,
};

// =============================================================================
// Re-exports - Reconciliation
// =============================================================================

pub use transform::chunked::ChunkPlan;
pub use transform::normalizer::{normalize, normalize_sku, NormalizedRecord, RecordKind};
pub use transform::pipeline::{reconcile, ReconcileOptions, ReconciliationReport};
pub use transform::{build_index, join, SkuIndex};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{default_export_name, export_csv, export_xlsx, ExportFormat, ExportRow};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ReconcileResponse, ResponseMetadata};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
