//! REST API types for client integration.
//!
//! Field names are camelCase; matched pairs use the export column names
//! (`sku`, `webName`, `qboName`, `qboDescription`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{FileSummary, ReconciliationRecord};
use crate::transform::pipeline::ReconciliationReport;

/// Response sent after both files were uploaded and reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" when something matched, "empty" otherwise
    pub status: String,

    /// Matched pairs, in accounting input order
    pub records: Vec<ReconciliationRecord>,

    /// Metadata about the run
    pub metadata: ResponseMetadata,
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// WEB file info
    pub web: FileSummary,

    /// Accounting file info
    pub accounting: FileSummary,

    /// Number of matched pairs
    pub matched: usize,

    /// Distinct SKUs in the WEB index
    pub indexed_skus: usize,

    /// WEB rows replaced by a later duplicate SKU
    pub duplicate_skus: usize,
}

impl From<ReconciliationReport> for ReconcileResponse {
    fn from(report: ReconciliationReport) -> Self {
        let status = if report.is_empty() { "empty" } else { "ready" };

        ReconcileResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            metadata: ResponseMetadata {
                web: report.web,
                accounting: report.accounting,
                matched: report.records.len(),
                indexed_skus: report.indexed_skus,
                duplicate_skus: report.duplicate_skus,
            },
            records: report.records,
        }
    }
}

/// Query string of `POST /api/export`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    /// `csv` (default) or `xlsx`
    pub format: Option<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceFormat;

    fn summary(name: &str, rows: usize) -> FileSummary {
        FileSummary {
            file_name: name.to_string(),
            format: SourceFormat::DelimitedText,
            row_count: rows,
            headers: vec!["sku".into()],
            preview: vec![],
            malformed_rows: 0,
            encoding: Some("utf-8".into()),
            delimiter: Some(','),
        }
    }

    fn report(records: Vec<ReconciliationRecord>) -> ReconciliationReport {
        ReconciliationReport {
            records,
            web: summary("web.csv", 3),
            accounting: summary("qbo.csv", 4),
            web_records: 3,
            accounting_records: 4,
            indexed_skus: 2,
            duplicate_skus: 1,
        }
    }

    #[test]
    fn test_response_from_report() {
        let record = ReconciliationRecord {
            sku: "WM-101".into(),
            web_product_name: "Wireless Mouse".into(),
            accounting_product_name: "Wireless Mouse".into(),
            accounting_description: "desc".into(),
        };
        let response = ReconcileResponse::from(report(vec![record]));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["records"][0]["webName"], "Wireless Mouse");
        assert_eq!(json["metadata"]["matched"], 1);
        assert_eq!(json["metadata"]["duplicateSkus"], 1);
        assert_eq!(json["metadata"]["web"]["fileName"], "web.csv");
        assert_eq!(json["metadata"]["accounting"]["rowCount"], 4);
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_empty_report_status() {
        let response = ReconcileResponse::from(report(vec![]));
        assert_eq!(response.status, "empty");
        assert_eq!(response.metadata.matched, 0);
    }

    #[test]
    fn test_error_response_shape() {
        let json = error_response("web file 'w.csv': File has a header row but no data rows");
        assert_eq!(json["status"], "error");
        assert!(json["error"].as_str().unwrap().contains("w.csv"));
        assert_eq!(json["records"], json!([]));
    }
}
