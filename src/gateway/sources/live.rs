//! Live source: forwards conversations to a Watson ML `ai_service` deployment.
//!
//! Retry policy is fixed: a 401 on the first attempt triggers exactly one
//! credential refresh and one resend. Every other failure, and any failure
//! on the resend, is final.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, error, info, trace, warn};

use crate::error::GatewayError;
use crate::gateway::{Credential, CredentialStore, GatewayResponse, Message};

#[derive(Serialize)]
struct ScoringRequest<'a> {
    messages: &'a [Message],
}

/// Position in the retry flow. `Refreshed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Refreshed,
}

/// Outcome of one POST to the scoring endpoint.
enum Outcome {
    Success(Box<RawValue>),
    Unauthorized,
}

#[derive(Debug, Clone)]
pub struct LiveSource {
    client: Client,
    scoring_url: String,
    credentials: Arc<CredentialStore>,
}

impl LiveSource {
    pub fn new(client: Client, scoring_url: String, credentials: Arc<CredentialStore>) -> Self {
        Self { client, scoring_url, credentials }
    }

    /// Send `conversation` upstream, acquiring a credential first if none is held.
    pub async fn send(&self, conversation: &[Message]) -> Result<GatewayResponse, GatewayError> {
        let mut credential = match self.credentials.current().await {
            Some(c) => c,
            None => self.credentials.acquire().await?,
        };

        let body = ScoringRequest { messages: conversation };
        let mut attempt = Attempt::Initial;

        loop {
            match self.post(&body, &credential, attempt).await? {
                Outcome::Success(payload) => return Ok(GatewayResponse::live(payload)),
                Outcome::Unauthorized if attempt == Attempt::Initial => {
                    info!("access token rejected, refreshing");
                    credential = self.credentials.acquire().await?;
                    attempt = Attempt::Refreshed;
                }
                Outcome::Unauthorized => {
                    error!("upstream rejected refreshed access token");
                    return Err(GatewayError::UpstreamCall(
                        "HTTP 401 Unauthorized after token refresh".into(),
                    ));
                }
            }
        }
    }

    async fn post(
        &self,
        body: &ScoringRequest<'_>,
        credential: &Credential,
        attempt: Attempt,
    ) -> Result<Outcome, GatewayError> {
        debug!(url = %self.scoring_url, ?attempt, messages = body.messages.len(), "sending scoring request");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(body)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full scoring request payload");
        }

        let response = self
            .client
            .post(&self.scoring_url)
            .bearer_auth(credential.secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.scoring_url, error = %e, "scoring request failed (transport)");
                GatewayError::UpstreamCall(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(?attempt, "scoring request returned 401");
            return Ok(Outcome::Unauthorized);
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%status, body = %text, "scoring request returned HTTP error");
            return Err(GatewayError::UpstreamCall(format!("HTTP {status}: {text}")));
        }

        let text = response.text().await.map_err(|e| {
            error!(error = %e, "failed to read scoring response body");
            GatewayError::UpstreamCall(format!("failed to read response body: {e}"))
        })?;
        let payload = RawValue::from_string(text).map_err(|e| {
            error!(error = %e, "scoring response is not JSON");
            GatewayError::UpstreamCall(format!("response body is not valid JSON: {e}"))
        })?;

        debug!(bytes = payload.get().len(), "received scoring response");
        Ok(Outcome::Success(payload))
    }
}
