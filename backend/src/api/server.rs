//! HTTP Server for the reconciliation API.
//!
//! Provides REST endpoints to reconcile two uploaded extracts and to
//! download the result.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/reconcile`  | Upload `web` + `accounting` files    |
//! | POST   | `/api/export`     | Records to CSV / XLSX download       |
//! | GET    | `/api/logs`       | SSE stream for logs and progress     |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, BroadcastProgress, LOG_BROADCASTER};
use super::types::{error_response, ExportQuery, ReconcileResponse};
use crate::error::{ReconcileError, ServerError};
use crate::export::{default_export_name, ExportFormat};
use crate::models::{ReconciliationRecord, SourceFile};
use crate::progress::CancelFlag;
use crate::transform::pipeline::{reconcile, ReconcileOptions};

/// Upload size limit for both files together
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Build the application router
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/reconcile", post(reconcile_upload))
        .route("/api/export", post(export_records))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 SKU reconciliation server running on http://localhost:{}", port);
    println!("   POST /api/reconcile - Upload web + accounting files");
    println!("   POST /api/export    - Download records (?format=csv|xlsx)");
    println!("   GET  /api/logs      - SSE log/progress stream");
    println!("   GET  /health        - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "skurecon",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "reconcile": "POST /api/reconcile",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log and progress streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Reconcile endpoint: multipart fields `web` and `accounting`
async fn reconcile_upload(mut multipart: Multipart) -> Result<Json<ReconcileResponse>, ApiError> {
    let mut web: Option<SourceFile> = None;
    let mut accounting: Option<SourceFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "web" && name != "accounting" {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{}.csv", name));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Read error: {}", e)))?;
        let source = SourceFile::new(file_name, bytes.to_vec());

        if name == "web" {
            web = Some(source);
        } else {
            accounting = Some(source);
        }
    }

    let web = web.ok_or_else(|| bad_request("No web file provided".to_string()))?;
    let accounting =
        accounting.ok_or_else(|| bad_request("No accounting file provided".to_string()))?;

    log_info(format!(
        "New upload: web '{}' ({} bytes), accounting '{}' ({} bytes)",
        web.name,
        web.bytes.len(),
        accounting.name,
        accounting.bytes.len()
    ));

    let options = ReconcileOptions::from_env();
    let report = reconcile(&web, &accounting, &options, &BroadcastProgress, &CancelFlag::new())
        .await
        .map_err(|e| api_error(ServerError::from(e)))?;

    Ok(Json(ReconcileResponse::from(report)))
}

/// Export endpoint: JSON array of records to an attachment
async fn export_records(
    Query(query): Query<ExportQuery>,
    Json(records): Json<Vec<ReconciliationRecord>>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        None => ExportFormat::Csv,
        Some(raw) => ExportFormat::parse(raw)
            .ok_or_else(|| bad_request(format!("Unknown export format '{}'", raw)))?,
    };

    let bytes = format
        .export(&records)
        .map_err(|e| api_error(ServerError::from(e)))?;
    let file_name = default_export_name(format.extension());

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn bad_request(message: String) -> ApiError {
    api_error(ServerError::BadRequest(message))
}

/// HTTP status for a server error
fn status_of(err: &ServerError) -> StatusCode {
    match err {
        ServerError::Reconcile(ReconcileError::Decode { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        ServerError::Reconcile(ReconcileError::Cancelled(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServerError::Export(crate::error::ExportError::EmptyExport) => StatusCode::BAD_REQUEST,
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: ServerError) -> ApiError {
    let status = status_of(&err);
    if status.is_server_error() {
        log_error(err.to_string());
    }
    (status, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ExportError};
    use crate::models::FileRole;
    use crate::progress::Stage;

    fn record() -> ReconciliationRecord {
        ReconciliationRecord {
            sku: "WM-101".into(),
            web_product_name: "Wireless Mouse".into(),
            accounting_product_name: "Wireless Mouse".into(),
            accounting_description: "desc".into(),
        }
    }

    #[test]
    fn test_status_mapping() {
        let decode = ServerError::from(ReconcileError::decode(
            FileRole::Web,
            "web.xlsx",
            DecodeError::NoSheets,
        ));
        assert_eq!(status_of(&decode), StatusCode::UNPROCESSABLE_ENTITY);

        let empty = ServerError::from(ExportError::EmptyExport);
        assert_eq!(status_of(&empty), StatusCode::BAD_REQUEST);

        let cancelled = ServerError::from(ReconcileError::Cancelled(Stage::Joining));
        assert_eq!(status_of(&cancelled), StatusCode::SERVICE_UNAVAILABLE);

        let bad = ServerError::BadRequest("missing field 'web'".into());
        assert_eq!(status_of(&bad), StatusCode::BAD_REQUEST);

        let write = ServerError::from(ExportError::Io(std::io::Error::other("disk full")));
        assert_eq!(status_of(&write), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_decode_error_body_names_file() {
        let (status, Json(body)) = api_error(ServerError::from(ReconcileError::decode(
            FileRole::Accounting,
            "qbo.csv",
            DecodeError::EmptyDataset,
        )));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("qbo.csv"));
    }

    #[tokio::test]
    async fn test_export_empty_is_bad_request() {
        let result = export_records(Query(ExportQuery::default()), Json(vec![])).await;
        let (status, Json(body)) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Nothing to export"));
    }

    #[tokio::test]
    async fn test_export_xlsx_headers() {
        let query = ExportQuery { format: Some("xlsx".into()) };
        let response = export_records(Query(query), Json(vec![record()])).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::CONTENT_TYPE],
            ExportFormat::Xlsx.content_type()
        );
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"reconciliation_export_"));
        assert!(disposition.ends_with(".xlsx\""));
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let query = ExportQuery { format: Some("pdf".into()) };
        let (status, _) = export_records(Query(query), Json(vec![record()])).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "skurecon");
    }
}
