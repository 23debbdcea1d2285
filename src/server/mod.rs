//! Axum HTTP surface: thin adapter over [`crate::adapters`].
//!
//! ## URL layout
//!
//! ```text
//! GET  /health
//! POST /research
//! POST /chat
//! GET  /test-connection
//! ```
//!
//! Every route answers CORS preflights and carries permissive CORS headers,
//! since the browser UI is served from a different origin.

mod api;

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::error::AppError;
use crate::gateway::Gateway;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: all fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Reported by `GET /health`.
    pub service_name: Arc<str>,
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(service_name: impl AsRef<str>, gateway: Gateway) -> Self {
        Self { service_name: Arc::from(service_name.as_ref()), gateway }
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

/// Serve until `shutdown` is cancelled.
pub async fn serve(bind_addr: &str, state: AppState, shutdown: CancellationToken) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, demo = state.gateway.is_demo(), "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

    info!("gateway shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health",          get(api::health))
        .route("/research",        post(api::research))
        .route("/chat",            post(api::chat))
        .route("/test-connection", get(api::test_connection))
        .with_state(state)
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(request_span))
}

// ── Middleware ────────────────────────────────────────────────────────────────

async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}

async fn request_span(req: Request, next: Next) -> Response {
    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    async move {
        let response = next.run(req).await;
        info!(status = response.status().as_u16(), "request completed");
        response
    }
    .instrument(span)
    .await
}
