//! HTTP API
//!
//! `GET /transaction?transaction_hash=..` returns the fee of one transaction
//! as a bare JSON number. `GET /transactions?start_time=..&end_time=..`
//! returns `[{hash, timestamp, transaction_fee_usdt}, ..]` for the window.
//! Errors are `{"detail": ".."}` bodies.

use crate::error::FeeError;
use crate::records::{parse_hash, FeeEntry};
use crate::resolver::FeeService;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{info, warn};

/// Header set on `/transactions` responses cut short by an upstream failure.
pub const PARTIAL_RESULT_HEADER: &str = "x-partial-result";

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Error converted into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<FeeError> for ApiError {
    fn from(err: FeeError) -> Self {
        let status = match err {
            FeeError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub transaction_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Parse a query datetime as UTC.
///
/// Accepts RFC 3339 (`2022-04-21T19:00:00Z`), naive ISO 8601 with `T` or a
/// space separator (taken as UTC), or integer epoch seconds.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(secs) = s.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_opt(secs, 0).single() {
            return Ok(dt);
        }
    }
    anyhow::bail!("Invalid datetime: {}", s)
}

/// Fee of one transaction.
pub async fn transaction(
    State(service): State<FeeService>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<f64>, ApiError> {
    let hash = parse_hash(&query.transaction_hash)
        .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;
    let fee = service.resolve(hash).await?;
    Ok(Json(fee))
}

/// Fees of every transfer in a time window.
pub async fn transactions(
    State(service): State<FeeService>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
    let start = parse_datetime(&query.start_time)
        .map_err(|e| ApiError::bad_request(format!("start_time: {:#}", e)))?;
    let end = parse_datetime(&query.end_time)
        .map_err(|e| ApiError::bad_request(format!("end_time: {:#}", e)))?;

    let result = service.reconcile(start, end).await?;
    let complete = result.is_complete();
    let entries: Vec<FeeEntry> = result.entries;

    let mut response = Json(entries).into_response();
    if !complete {
        response.headers_mut().insert(
            HeaderName::from_static(PARTIAL_RESULT_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    Ok(response)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
    })
}

async fn root() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/health")])
}

/// Build the API router.
pub fn router(service: FeeService) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/transaction", get(transaction))
        .route("/transactions", get(transactions))
        .with_state(service)
}

/// Serve the API until the task is dropped.
pub async fn serve(addr: SocketAddr, service: FeeService) -> Result<()> {
    let app = router(service);

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
