//! In-process stand-ins for the identity and scoring endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::{Config, Scope};

pub const DEPLOYMENT: &str = "dep-1";
pub const VERSION: &str = "2021-05-01";

/// Body served on every successful scoring call; spacing and key order are
/// deliberately non-canonical.
pub const RAW_BODY: &str = r#"{"results":[{"generated_text":"hi"}],  "z":1,"a":2}"#;

/// Fake upstream with hit counters and scripted scoring statuses.
#[derive(Clone, Default)]
pub struct Upstream {
    pub token_hits: Arc<AtomicUsize>,
    pub scoring_hits: Arc<AtomicUsize>,
    /// Status per scoring call, by index; past the end means 200.
    pub script: Arc<Vec<u16>>,
    /// `(authorization header, JSON body)` of every scoring call.
    pub seen: Arc<Mutex<Vec<(String, Value)>>>,
    /// Held before each token response is sent.
    pub token_delay: Duration,
}

impl Upstream {
    pub fn scripted(statuses: &[u16]) -> Self {
        Self { script: Arc::new(statuses.to_vec()), ..Default::default() }
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn tokens(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    pub fn scorings(&self) -> usize {
        self.scoring_hits.load(Ordering::SeqCst)
    }

    /// Serve on an ephemeral localhost port.
    pub async fn spawn(&self) -> SocketAddr {
        let router = Router::new()
            .route("/identity/token", post(token))
            .route(&format!("/deployments/{DEPLOYMENT}/ai_service"), post(scoring))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }
}

async fn token(State(up): State<Upstream>) -> Json<Value> {
    let n = up.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
    if !up.token_delay.is_zero() {
        tokio::time::sleep(up.token_delay).await;
    }
    Json(json!({ "access_token": format!("tok-{n}") }))
}

async fn scoring(
    State(up): State<Upstream>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let idx = up.scoring_hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    up.seen.lock().await.push((auth, body));

    if uri.query() != Some(format!("version={VERSION}").as_str()) {
        return (StatusCode::BAD_REQUEST, "missing version").into_response();
    }

    match up.script.get(idx).copied().unwrap_or(200) {
        200 => ([("content-type", "application/json")], RAW_BODY).into_response(),
        code => (StatusCode::from_u16(code).unwrap(), "nope").into_response(),
    }
}

/// Live-scope config pointing at `addr`.
pub fn live_config(addr: SocketAddr) -> Config {
    let mut cfg = Config::test_default();
    cfg.scope = Scope::ApiKey("key".into());
    cfg.watson.deployment_id = DEPLOYMENT.into();
    cfg.watson.version = VERSION.into();
    cfg.watson.watson_ml_url = format!("http://{addr}/deployments");
    cfg.watson.iam_url = format!("http://{addr}/identity/token");
    cfg
}
