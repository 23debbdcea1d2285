//! Demo simulator: canned responses keyed on the first user message.
//!
//! Used for development without real credentials. No network I/O; the only
//! side effect is an async sleep standing in for upstream latency.

use std::time::Duration;

use serde::Serialize;
use serde_json::value::RawValue;
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{GatewayResponse, Message, Role};

/// Checked in order; the first substring match wins.
const TOPICS: &[(&str, &str)] = &[
    (
        "artificial intelligence",
        "Artificial Intelligence (AI) refers to computer systems that can perform tasks typically requiring human intelligence, such as learning, reasoning, and problem-solving.",
    ),
    (
        "quantum computing",
        "Quantum computing leverages quantum mechanical phenomena to process information in ways that classical computers cannot, potentially solving complex problems exponentially faster.",
    ),
    (
        "machine learning",
        "Machine learning is a subset of AI that enables computers to learn and improve from experience without being explicitly programmed for every task.",
    ),
    (
        "research",
        "Research is a systematic investigation process designed to discover new knowledge, verify existing knowledge, or solve specific problems through organized data collection and analysis.",
    ),
];

const FALLBACK: &str = "This is a demo response for your query. In production, this would be processed by IBM Watson ML to provide comprehensive research insights about your topic.";

#[derive(Serialize)]
struct DemoPayload<'a> {
    generated_text: &'a str,
    demo_mode: bool,
}

#[derive(Debug, Clone)]
pub struct DemoSimulator {
    latency: Duration,
}

impl DemoSimulator {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Wait out the simulated latency, then answer from the keyword table.
    pub async fn simulate(&self, conversation: &[Message]) -> Result<GatewayResponse, GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let text = canned_text(conversation);
        debug!(text_len = text.len(), "serving demo response");

        let json = serde_json::to_string(&DemoPayload { generated_text: text, demo_mode: true })
            .map_err(|e| GatewayError::UpstreamCall(format!("demo payload serialization failed: {e}")))?;
        let payload = RawValue::from_string(json)
            .map_err(|e| GatewayError::UpstreamCall(format!("demo payload invalid: {e}")))?;

        Ok(GatewayResponse::demo(payload))
    }
}

/// Pick the canned text for the first user message in `conversation`.
pub fn canned_text(conversation: &[Message]) -> &'static str {
    let query = conversation
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.to_lowercase())
        .unwrap_or_default();

    TOPICS
        .iter()
        .find(|(keyword, _)| query.contains(*keyword))
        .map(|(_, text)| *text)
        .unwrap_or(FALLBACK)
}
