//! High-level reconciliation pipeline.
//!
//! Combines every stage into one run: decode both files, normalize rows,
//! index the WEB side by SKU and join the accounting side against it.
//!
//! # Example
//!
//! ```rust,ignore
//! use skurecon::models::SourceFile;
//! use skurecon::progress::{CancelFlag, NoProgress};
//! use skurecon::transform::pipeline::{reconcile, ReconcileOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let web = SourceFile::from_path("web.csv")?;
//!     let qbo = SourceFile::from_path("qbo.xlsx")?;
//!     let report = reconcile(&web, &qbo, &ReconcileOptions::default(), &NoProgress, &CancelFlag::new()).await?;
//!
//!     println!("{} matched records", report.records.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::aliases::{self, AliasSet};
use super::chunked::ChunkPlan;
use super::index::build_index;
use super::join::join;
use super::normalizer::{normalize_accounting, normalize_web, unresolved_fields};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{
    AccountingRecord, FileRole, FileSummary, ReconciliationRecord, SourceFile, WebRecord,
};
use crate::parser::{canonicalize_header, decode, DecodedFile};
use crate::progress::{CancelFlag, ProgressSink, Stage};

pub const DECODE_CHUNK_ENV: &str = "SKURECON_DECODE_CHUNK";
pub const INDEX_CHUNK_ENV: &str = "SKURECON_INDEX_CHUNK";
pub const JOIN_CHUNK_ENV: &str = "SKURECON_JOIN_CHUNK";
pub const PREVIEW_ROWS_ENV: &str = "SKURECON_PREVIEW_ROWS";

/// Options for a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileOptions {
    /// Rows decoded between two yield points
    pub decode_chunk_size: usize,

    /// WEB records indexed between two yield points
    pub index_chunk_size: usize,

    /// Accounting records joined between two yield points
    pub join_chunk_size: usize,

    /// Rows kept in each file's preview
    pub preview_rows: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            decode_chunk_size: 5000,
            index_chunk_size: 10_000,
            join_chunk_size: 500,
            preview_rows: 5,
        }
    }
}

impl ReconcileOptions {
    /// Defaults overlaid with the `SKURECON_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Unparsable or zero chunk sizes keep their default. A zero preview
    /// is allowed.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());
        let chunk = |key: &str, default: usize| read(key).filter(|n| *n > 0).unwrap_or(default);

        Self {
            decode_chunk_size: chunk(DECODE_CHUNK_ENV, defaults.decode_chunk_size),
            index_chunk_size: chunk(INDEX_CHUNK_ENV, defaults.index_chunk_size),
            join_chunk_size: chunk(JOIN_CHUNK_ENV, defaults.join_chunk_size),
            preview_rows: read(PREVIEW_ROWS_ENV).unwrap_or(defaults.preview_rows),
        }
    }
}

/// Result of a complete reconciliation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Matched pairs, in accounting input order
    pub records: Vec<ReconciliationRecord>,

    /// WEB file diagnostics
    pub web: FileSummary,

    /// Accounting file diagnostics
    pub accounting: FileSummary,

    /// Normalized WEB rows
    pub web_records: usize,

    /// Normalized accounting rows
    pub accounting_records: usize,

    /// Distinct SKUs in the index
    pub indexed_skus: usize,

    /// WEB rows replaced by a later duplicate SKU
    pub duplicate_skus: usize,
}

impl ReconciliationReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reconcile a WEB export against an accounting export.
///
/// Steps:
/// 1. Decode and normalize the WEB file
/// 2. Decode and normalize the accounting file
/// 3. Index WEB records by SKU (last write wins)
/// 4. Join accounting records against the index (inner join)
///
/// Zero matches is a valid outcome, not an error.
///
/// # Errors
/// A file that cannot be decoded aborts the run before any index is
/// built. A set `cancel` flag stops the run at the next chunk boundary.
pub async fn reconcile(
    web: &SourceFile,
    accounting: &SourceFile,
    options: &ReconcileOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> ReconcileResult<ReconciliationReport> {
    log_info(format!("Reconciling '{}' against '{}'", web.name, accounting.name));

    // Step 1: WEB side
    let web_file = decode_file(web, FileRole::Web, options, sink, cancel).await?;
    report_unresolved(FileRole::Web, &web_file, aliases::web::ALL);
    let web_records: Vec<WebRecord> = web_file.rows.iter().map(normalize_web).collect();

    // Step 2: accounting side
    let accounting_file = decode_file(accounting, FileRole::Accounting, options, sink, cancel).await?;
    report_unresolved(FileRole::Accounting, &accounting_file, aliases::accounting::ALL);
    let accounting_records: Vec<AccountingRecord> = accounting_file
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| normalize_accounting(row, i))
        .collect();

    // Step 3: index
    let index = build_index(
        &web_records,
        ChunkPlan::new(Stage::BuildingIndex, options.index_chunk_size, sink, cancel),
    )
    .await?;

    let skipped = web_records.len() - web_records.iter().filter(|r| !r.sku.is_empty()).count();
    if skipped > 0 {
        log_warning(format!("{} WEB rows have no SKU and were not indexed", skipped));
    }
    if index.overwritten() > 0 {
        log_warning(format!(
            "{} WEB rows share a SKU with a later row; the later row was kept",
            index.overwritten()
        ));
    }
    log_info(format!("Indexed {} distinct SKUs", index.len()));

    // Step 4: join
    let records = join(
        &accounting_records,
        &index,
        ChunkPlan::new(Stage::Joining, options.join_chunk_size, sink, cancel),
    )
    .await?;

    sink.progress(Stage::Done, 100);
    sink.status(&format!("{} matched records", records.len()));
    log_success(format!(
        "{} of {} accounting rows matched a WEB SKU",
        records.len(),
        accounting_records.len()
    ));

    Ok(ReconciliationReport {
        records,
        web: web_file.summary,
        accounting: accounting_file.summary,
        web_records: web_records.len(),
        accounting_records: accounting_records.len(),
        indexed_skus: index.len(),
        duplicate_skus: index.overwritten(),
    })
}

/// Decode one input, tagging errors and progress with its role.
async fn decode_file(
    source: &SourceFile,
    role: FileRole,
    options: &ReconcileOptions,
    sink: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> ReconcileResult<DecodedFile> {
    let plan = ChunkPlan::new(role.decode_stage(), options.decode_chunk_size, sink, cancel);
    let decoded = decode(source, options.preview_rows, plan)
        .await
        .map_err(|e| ReconcileError::decode(role, source.name.as_str(), e))?;

    sink.status(&format!(
        "Loaded {} file '{}' ({} rows)",
        role,
        source.name,
        decoded.summary.row_count
    ));
    Ok(decoded)
}

/// Log the fields no header of `file` can supply.
fn report_unresolved(role: FileRole, file: &DecodedFile, table: &[AliasSet]) {
    let keys: Vec<String> = file
        .summary
        .headers
        .iter()
        .map(|h| canonicalize_header(h))
        .collect();
    let missing = unresolved_fields(keys.iter().map(String::as_str), table);
    if !missing.is_empty() {
        log_warning(format!(
            "{} file '{}': no column for {} (defaulted)",
            role,
            file.summary.file_name,
            missing.join(", ")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::progress::NoProgress;
    use std::sync::Mutex;

    fn csv(name: &str, content: &str) -> SourceFile {
        SourceFile::new(name, content.as_bytes().to_vec())
    }

    async fn run(web: &SourceFile, accounting: &SourceFile) -> ReconcileResult<ReconciliationReport> {
        reconcile(web, accounting, &ReconcileOptions::default(), &NoProgress, &CancelFlag::new()).await
    }

    #[test]
    fn test_default_options() {
        let opts = ReconcileOptions::default();
        assert_eq!(opts.decode_chunk_size, 5000);
        assert_eq!(opts.index_chunk_size, 10_000);
        assert_eq!(opts.join_chunk_size, 500);
        assert_eq!(opts.preview_rows, 5);
    }

    #[test]
    fn test_options_from_lookup() {
        let opts = ReconcileOptions::from_lookup(|key| match key {
            JOIN_CHUNK_ENV => Some("250".to_string()),
            INDEX_CHUNK_ENV => Some("0".to_string()),
            DECODE_CHUNK_ENV => Some("lots".to_string()),
            PREVIEW_ROWS_ENV => Some(" 0 ".to_string()),
            _ => None,
        });
        assert_eq!(opts.join_chunk_size, 250);
        assert_eq!(opts.index_chunk_size, 10_000);
        assert_eq!(opts.decode_chunk_size, 5000);
        assert_eq!(opts.preview_rows, 0);
    }

    #[test]
    fn test_options_partial_json() {
        let opts: ReconcileOptions = serde_json::from_str(r#"{"joinChunkSize": 100}"#).unwrap();
        assert_eq!(opts.join_chunk_size, 100);
        assert_eq!(opts.decode_chunk_size, 5000);
    }

    #[tokio::test]
    async fn test_wireless_mouse_scenario() {
        let web = csv("web.csv", "SKU,Product Name\nWM-101,Wireless Mouse\n");
        let qbo = csv(
            "qbo.csv",
            "SKU,Product,Description\nwm-101,Category:Wireless Mouse,desc\n",
        );

        let report = run(&web, &qbo).await.unwrap();

        assert_eq!(
            report.records,
            vec![ReconciliationRecord {
                sku: "WM-101".into(),
                web_product_name: "Wireless Mouse".into(),
                accounting_product_name: "Wireless Mouse".into(),
                accounting_description: "desc".into(),
            }]
        );
        assert_eq!(report.indexed_skus, 1);
        assert_eq!(report.web.file_name, "web.csv");
    }

    #[tokio::test]
    async fn test_web_without_skus_gives_empty_result() {
        let web = csv("web.csv", "Product Name,Qty\nWireless Mouse,1\nLaptop,2\n");
        let qbo = csv("qbo.csv", "SKU,Product\nWM-101,Mouse\nLP-404,Laptop\n");

        let report = run(&web, &qbo).await.unwrap();

        assert!(report.is_empty());
        assert_eq!(report.web_records, 2);
        assert_eq!(report.indexed_skus, 0);
        assert_eq!(report.accounting_records, 2);
    }

    #[tokio::test]
    async fn test_duplicate_web_sku_last_wins() {
        let web = csv(
            "web.csv",
            "sku,name\nWM-101,Old Mouse\nLP-404,Laptop\nwm-101,New Mouse\n",
        );
        let qbo = csv("qbo.csv", "sku,product\nWM-101,Mouse\n");

        let report = run(&web, &qbo).await.unwrap();

        assert_eq!(report.records[0].web_product_name, "New Mouse");
        assert_eq!(report.duplicate_skus, 1);
        assert_eq!(report.indexed_skus, 2);
    }

    #[tokio::test]
    async fn test_malformed_accounting_row_tolerated() {
        let web = csv("web.csv", "sku,name\nA-1,Alpha\nB-2,Beta\nC-3,Gamma\n");
        let qbo = csv(
            "qbo.csv",
            "sku,product,description\nA-1,Alpha,a\nB-2,Beta\nC-3,Gamma,c\n",
        );

        let report = run(&web, &qbo).await.unwrap();

        assert_eq!(report.accounting.malformed_rows, 1);
        assert_eq!(report.accounting_records, 2);
        let skus: Vec<&str> = report.records.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["A-1", "C-3"]);
    }

    #[tokio::test]
    async fn test_empty_accounting_file_names_the_file() {
        let web = csv("web.csv", "sku,name\nA-1,Alpha\n");
        let qbo = csv("qbo.csv", "sku,product\n");

        let err = run(&web, &qbo).await.unwrap_err();

        match err {
            ReconcileError::Decode {
                role,
                file_name,
                source,
            } => {
                assert_eq!(role, FileRole::Accounting);
                assert_eq!(file_name, "qbo.csv");
                assert!(matches!(source, DecodeError::EmptyDataset));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_stage_order_and_done() {
        let web = csv("web.csv", "sku,name\nA-1,Alpha\n");
        let qbo = csv("qbo.csv", "sku,product\nA-1,Alpha\n");
        let seen = Mutex::new(Vec::new());
        let sink = |stage: Stage, p: u8| seen.lock().unwrap().push((stage, p));

        reconcile(&web, &qbo, &ReconcileOptions::default(), &sink, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                (Stage::DecodingWeb, 100),
                (Stage::DecodingAccounting, 100),
                (Stage::BuildingIndex, 100),
                (Stage::Joining, 100),
                (Stage::Done, 100),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_run() {
        let web = csv("web.csv", "sku,name\nA-1,Alpha\n");
        let qbo = csv("qbo.csv", "sku,product\nA-1,Alpha\n");
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = reconcile(&web, &qbo, &ReconcileOptions::default(), &NoProgress, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Cancelled(Stage::DecodingWeb)));
    }
}
