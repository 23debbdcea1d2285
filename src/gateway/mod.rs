//! Gateway client: credential lifecycle plus dispatch to the inference service.
//!
//! [`Gateway::dispatch`] is the single entry point request adapters call.
//! Whether a conversation is answered by the local simulator or the live
//! upstream is decided once, at construction, by [`ResponseSource`].
//!
//! The gateway is cheap to clone: the credential store is shared behind an
//! `Arc` and `reqwest::Client` is reference-counted internally.

pub mod credentials;
pub mod sources;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, GatewayError};

pub use credentials::{Credential, CredentialStore};
use sources::demo::DemoSimulator;
use sources::live::LiveSource;

// ── Conversation types ────────────────────────────────────────────────────────

/// Closed set of speaker roles understood by the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One dialogue turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Ordered dialogue turns; order is significant.
pub type Conversation = Vec<Message>;

// ── Response ──────────────────────────────────────────────────────────────────

/// Payload returned to the adapter.
///
/// `payload` holds the upstream JSON exactly as received so it can be
/// re-embedded without reshaping.
pub struct GatewayResponse {
    pub payload: Box<RawValue>,
    pub demo: bool,
}

impl GatewayResponse {
    pub fn live(payload: Box<RawValue>) -> Self {
        Self { payload, demo: false }
    }

    pub fn demo(payload: Box<RawValue>) -> Self {
        Self { payload, demo: true }
    }

    pub fn as_json_str(&self) -> &str {
        self.payload.get()
    }
}

impl fmt::Debug for GatewayResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayResponse")
            .field("payload_len", &self.payload.get().len())
            .field("demo", &self.demo)
            .finish()
    }
}

// ── Response source ───────────────────────────────────────────────────────────

/// Where responses come from, chosen once from the configured scope.
///
/// Enum dispatch keeps call sites free of `dyn` and of any sentinel checks.
#[derive(Debug, Clone)]
pub enum ResponseSource {
    Simulated(DemoSimulator),
    Live(LiveSource),
}

impl ResponseSource {
    pub async fn respond(&self, conversation: &[Message]) -> Result<GatewayResponse, GatewayError> {
        match self {
            ResponseSource::Simulated(sim) => sim.simulate(conversation).await,
            ResponseSource::Live(live) => live.send(conversation).await,
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Gateway {
    credentials: Arc<CredentialStore>,
    source: ResponseSource,
}

impl Gateway {
    /// Build the gateway from resolved configuration.
    ///
    /// Fails only at startup, when the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.watson.timeout())
            .build()
            .map_err(|e| AppError::Server(format!("failed to build HTTP client: {e}")))?;

        let credentials = Arc::new(CredentialStore::new(
            config.scope.clone(),
            config.watson.iam_url.clone(),
            client.clone(),
        ));

        let source = if config.scope.is_demo() {
            ResponseSource::Simulated(DemoSimulator::new(config.watson.demo_latency()))
        } else {
            ResponseSource::Live(LiveSource::new(
                client,
                config.watson.scoring_url(),
                Arc::clone(&credentials),
            ))
        };

        Ok(Self { credentials, source })
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.source, ResponseSource::Simulated(_))
    }

    /// Shared credential store, used directly by the connectivity probe.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Answer `conversation` from the configured source.
    pub async fn dispatch(&self, conversation: &[Message]) -> Result<GatewayResponse, GatewayError> {
        debug!(messages = conversation.len(), demo = self.is_demo(), "dispatching conversation");
        self.source.respond(conversation).await
    }
}
