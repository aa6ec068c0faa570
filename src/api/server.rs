//! API Server Module
//!
//! HTTP surface of the batch engine:
//! - `POST /batch` submits a batch and returns its projection
//! - `GET /batch/:address/:id` reads one batch
//! - `GET /batch/:address` lists the live batches of an address
//!
//! Only validation failures are reported as client errors; outcomes of
//! later groups are observed by polling the batch.

use crate::{
    BatchRequest,
    batch::{BatchOrchestrator, BatchView},
    config::ApiConfig,
    error::BatchError,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared application state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<BatchOrchestrator>,
}

/// The API server
pub struct Server {
    config: ApiConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ApiConfig, orchestrator: Arc<BatchOrchestrator>) -> Self {
        Self {
            config,
            state: AppState { orchestrator },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/batch", post(submit_batch))
            .route("/batch/:address", get(list_batches))
            .route("/batch/:address/:id", get(get_batch))
            .with_state(self.state.clone())
    }

    /// Bind to the configured address and serve until the process stops
    pub async fn start(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Error body returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        if e.is_validation() {
            ApiError::BadRequest(e.to_string())
        } else {
            error!("Request failed: {}", e);
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Client address as reported by the proxy in front of the service
fn source_ip(headers: &HeaderMap) -> Option<String> {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

async fn submit_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchView>, ApiError> {
    info!("Received batch '{}' with {} groups", request.id, request.transactions.len());

    let batch = state
        .orchestrator
        .submit_batch(request, source_ip(&headers))
        .await
        .inspect_err(|e| {
            if e.is_validation() {
                warn!("Batch rejected: {}", e);
            }
        })?;

    Ok(Json(BatchView::from(&batch)))
}

async fn get_batch(
    State(state): State<AppState>,
    Path((address, id)): Path<(String, String)>,
) -> Result<Json<BatchView>, ApiError> {
    match state.orchestrator.get_batch(&address, &id).await? {
        Some(batch) => Ok(Json(BatchView::from(&batch))),
        None => Err(ApiError::NotFound("Transaction batch not found".to_string())),
    }
}

async fn list_batches(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<BatchView>>, ApiError> {
    let batches = state.orchestrator.list_batches(&address).await?;
    Ok(Json(batches.iter().map(BatchView::from).collect()))
}
