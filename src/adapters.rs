//! Request adapters: turn caller input into a conversation and wrap the
//! gateway's answer for the wire.
//!
//! Adapters hold no state. Each one validates its input, makes exactly one
//! call into the gateway, and returns either a complete reply or an error.

use serde::{Deserialize, Serialize};
use serde_json::{Value, value::RawValue};
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::{Conversation, Gateway, Message};

pub const RESEARCH_PREAMBLE: &str = "You are a helpful research assistant. Provide comprehensive, accurate, and well-structured responses based on the user's query.";

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

// ── Research ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResearchReply {
    pub query: String,
    pub response: Box<RawValue>,
    pub status: &'static str,
}

/// System preamble plus one user turn embedding `query` and `context`.
pub fn research_conversation(req: &ResearchRequest) -> Result<Conversation, GatewayError> {
    let query = req
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| GatewayError::Validation("Query is required".into()))?;
    let context = req.context.as_deref().unwrap_or_default();

    Ok(vec![
        Message::system(RESEARCH_PREAMBLE),
        Message::user(format!("Research Query: {query}\nContext: {context}")),
    ])
}

pub async fn research(gateway: &Gateway, req: ResearchRequest) -> Result<ResearchReply, GatewayError> {
    let conversation = research_conversation(&req)?;
    let response = gateway.dispatch(&conversation).await?;
    info!(demo = response.demo, "research query answered");

    Ok(ResearchReply {
        query: req.query.unwrap_or_default(),
        response: response.payload,
        status: STATUS_SUCCESS,
    })
}

// ── Chat ──────────────────────────────────────────────────────────────────────

/// `messages` stays untyped until validation so bad shapes get a precise
/// 400 instead of a generic body-parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: Box<RawValue>,
    pub status: &'static str,
}

/// Validate the caller's conversation. Order and content are kept as given.
///
/// Each item is reduced to its `role` and `content`; any other keys (`name`,
/// tool metadata, ...) are dropped before the conversation goes upstream.
pub fn chat_conversation(req: ChatRequest) -> Result<Conversation, GatewayError> {
    let items = match req.messages {
        Some(Value::Array(items)) => items,
        _ => return Err(GatewayError::Validation("Messages array is required".into())),
    };
    if items.is_empty() {
        return Err(GatewayError::Validation("Messages array must not be empty".into()));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<Message>(item)
                .map_err(|e| GatewayError::Validation(format!("invalid message at index {i}: {e}")))
        })
        .collect()
}

pub async fn chat(gateway: &Gateway, req: ChatRequest) -> Result<ChatReply, GatewayError> {
    let conversation = chat_conversation(req)?;
    let response = gateway.dispatch(&conversation).await?;
    info!(messages = conversation.len(), demo = response.demo, "chat answered");

    Ok(ChatReply { response: response.payload, status: STATUS_SUCCESS })
}

// ── Connectivity probe ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "tokenPreview", skip_serializing_if = "Option::is_none")]
    pub token_preview: Option<String>,
}

impl ConnectionReport {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Force a fresh acquisition and report the outcome. Diagnostics only.
pub async fn test_connection(gateway: &Gateway) -> ConnectionReport {
    match gateway.credentials().acquire().await {
        Ok(credential) => ConnectionReport {
            status: STATUS_SUCCESS,
            message: "Successfully connected to Watson ML".into(),
            token_preview: Some(credential.preview()),
        },
        Err(e) => {
            warn!(error = %e, "connection test failed");
            ConnectionReport {
                status: STATUS_ERROR,
                message: format!("Connection failed: {e}"),
                token_preview: None,
            }
        }
    }
}
