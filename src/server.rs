//! HTTP surface for browser front ends.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/api/process` | [`InboundRequest`] JSON → [`OutboundResponse`] JSON |
//! | `GET`  | `/health` | none → `{"status":"healthy","version":...}` |
//!
//! A body that is not valid JSON gets the same failure envelope as any other
//! failed run (`500`, kind `validation_failure`).

use crate::boundary::{process_inbound, InboundRequest, OutboundResponse};
use crate::error::IntegrationError;
use crate::integrate::Integrator;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the router over a shared [`Integrator`].
pub fn create_router(integrator: Integrator) -> Router {
    Router::new()
        .route("/api/process", post(process_documents))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(integrator)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, integrator: Integrator) -> Result<(), IntegrationError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IntegrationError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, create_router(integrator))
        .await
        .map_err(|e| IntegrationError::Internal(format!("server error: {}", e)))
}

/// POST /api/process
async fn process_documents(
    State(integrator): State<Integrator>,
    payload: Result<Json<InboundRequest>, JsonRejection>,
) -> Response {
    let response = match payload {
        Ok(Json(inbound)) => process_inbound(&integrator, inbound).await,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            OutboundResponse::failure(&IntegrationError::Validation(rejection.body_text()))
        }
    };

    let status = StatusCode::from_u16(response.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
