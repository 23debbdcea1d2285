//! Axum handlers for the gateway routes.
//!
//! Body parsing failures are folded into the same 400 shape as validation
//! errors, so callers never see framework-specific 415/422 responses.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use super::AppState;
use crate::adapters::{self, ChatRequest, ResearchRequest};
use crate::error::GatewayError;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn error_response(err: GatewayError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    (status, Json(json!({ "error": err.to_string(), "status": "error" }))).into_response()
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    body.map(|Json(v)| v)
        .map_err(|e| GatewayError::Validation(format!("invalid request body: {}", e.body_text())))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "service": &*state.service_name,
        "demo_mode": state.gateway.is_demo(),
    }))
    .into_response()
}

/// POST /research
pub(super) async fn research(
    State(state): State<AppState>,
    body: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };
    match adapters::research(&state.gateway, req).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /chat
pub(super) async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let req = match parse_body(body) {
        Ok(req) => req,
        Err(e) => return error_response(e),
    };
    match adapters::chat(&state.gateway, req).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /test-connection
pub(super) async fn test_connection(State(state): State<AppState>) -> Response {
    let report = adapters::test_connection(&state.gateway).await;
    let status = if report.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report)).into_response()
}
