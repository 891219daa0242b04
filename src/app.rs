#![cfg(feature = "web")]

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::ReportConfig;
use crate::dashboard::{self, ReportRequest};
use crate::downloader::{self, ExportLabels};
use crate::error::ReportError;
use crate::source::{CsvLogSource, LogSource};

/// Shared, read-only server state
///
/// Per-viewer choices travel in each request's query string as a
/// [`ReportRequest`]; nothing here changes after startup.
pub struct AppState {
    pub config: ReportConfig,
    pub source: Arc<dyn LogSource>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct NotificationResponse {
    status: String,
    notification: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/report", get(get_report))
        .route("/api/report.csv", get(export_csv))
        .route("/api/report.xlsx", get(export_xlsx))
        .route("/api/notification", get(get_notification))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve the report API until shutdown
///
/// # Arguments
/// * `config` - Loaded configuration; `log_dir` and the column names build
///   the CSV log source, `listen` is the bind address
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Ok when the server stops
///   cleanly, or the bind/serve error
pub async fn run(config: ReportConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = CsvLogSource::new(config.log_dir.clone(), config.columns());
    let listen = config.listen.clone();

    let app_state = Arc::new(AppState {
        config,
        source: Arc::new(source),
    });

    let listener = TcpListener::bind(&listen).await?;
    info!("Listening on http://{}", listen);
    axum::serve(listener, router(app_state)).await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: None,
    })
}

async fn get_report(
    Query(request): Query<ReportRequest>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("report requested: {:?}", request);
    match dashboard::render(state.source.as_ref(), &state.config, &request, today()) {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

async fn export_csv(
    Query(request): Query<ReportRequest>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("csv export requested: {:?}", request);
    match dashboard::render(state.source.as_ref(), &state.config, &request, today()) {
        Ok(report) => {
            let labels = ExportLabels::from_config(&state.config.aggregator());
            let body = downloader::to_csv(&report.table, &labels);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn export_xlsx(
    Query(request): Query<ReportRequest>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("xlsx export requested: {:?}", request);
    let labels = ExportLabels::from_config(&state.config.aggregator());
    let bytes = dashboard::render(state.source.as_ref(), &state.config, &request, today())
        .and_then(|report| downloader::to_xlsx(&report.table, &labels));

    match bytes {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, downloader::XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", downloader::XLSX_FILE_NAME),
                ),
            ],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_notification(State(state): State<Arc<AppState>>) -> Response {
    info!("notification requested");
    match dashboard::latest_notification(state.source.as_ref(), &state.config) {
        Ok(notification) => Json(NotificationResponse {
            status: "ok".to_string(),
            notification,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

fn error_response(err: ReportError) -> Response {
    let status = match &err {
        ReportError::Validation { .. }
        | ReportError::RangeTooLarge { .. }
        | ReportError::MalformedTimestamp { .. } => StatusCode::BAD_REQUEST,
        ReportError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        ReportError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
        ReportError::Config(_) | ReportError::Io(_) | ReportError::Xlsx(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error!("request failed ({}): {}", status, err);

    (
        status,
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(err.to_string()),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawEvent;
    use crate::source::MemoryLogSource;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let source = MemoryLogSource::new()
            .with_table(
                "Daily",
                vec![
                    RawEvent::new(1, "13/12/2024 09:07:00", "Bot"),
                    RawEvent::new(2, "13/12/2024 09:40:00", "Supervisor"),
                ],
            )
            .with_notes("Notification", vec!["all quiet".to_string()]);

        router(Arc::new(AppState {
            config: ReportConfig::default(),
            source: Arc::new(source),
        }))
    }

    async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn report_returns_dense_json() {
        let (status, body) = get("/api/report?start=2024-12-13&end=2024-12-13&width=30").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cards"]["total"], 2);
        assert_eq!(json["cards"]["primary"], 1);
        assert_eq!(json["summary"]["percentage"], 50.0);
        assert_eq!(json["table"]["rows"].as_array().unwrap().len(), 48);
        assert_eq!(json["table"]["rows"][18]["bucket"], "09:00");
        assert_eq!(json["table"]["rows"][18]["percentage"], 100.0);
    }

    #[tokio::test]
    async fn reversed_range_is_bad_request() {
        let (status, body) = get("/api/report?start=2024-12-14&end=2024-12-13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn oversized_range_is_bad_request() {
        let (status, body) = get("/api/report.xlsx?start=0001-01-01&end=9999-12-31").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("exceeds the limit"));
    }

    #[tokio::test]
    async fn exports_xlsx_and_csv() {
        let (status, body) = get("/api/report.xlsx?start=2024-12-13&end=2024-12-13").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..2], b"PK");

        let (status, body) = get("/api/report.csv?start=2024-12-13&end=2024-12-13").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap().lines().count(), 1 + 96);
    }

    #[tokio::test]
    async fn serves_latest_notification() {
        let (status, body) = get("/api/notification").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["notification"], "all quiet");
    }
}
