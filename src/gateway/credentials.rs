//! Credential store: holds the bearer token for the upstream service.
//!
//! The token is acquired lazily and replaced wholesale on every
//! re-acquisition. Expiry is never tracked: a token is assumed valid until
//! the upstream rejects it with 401.
//!
//! Acquisition is not serialised. Two requests that race on an absent or
//! rejected token may both hit the identity endpoint; the last write wins.
//! The lock only guards the swap and is never held across network I/O.

use std::fmt;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::Scope;
use crate::error::GatewayError;

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const CPD_KEY_PREFIX: &str = "cpd-apikey";
const DEMO_TOKEN: &str = "demo_token_12345";
const PREVIEW_CHARS: usize = 20;

// ── Credential ────────────────────────────────────────────────────────────────

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// First 20 characters followed by `...`, safe to log or return.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.preview())
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CredentialStore {
    scope: Scope,
    iam_url: String,
    client: Client,
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new(scope: Scope, iam_url: String, client: Client) -> Self {
        Self { scope, iam_url, client, current: RwLock::new(None) }
    }

    /// `true` when the store hands out the synthetic demo token.
    pub fn is_demo(&self) -> bool {
        self.scope.is_demo()
    }

    /// The held credential, or `None` before the first acquisition.
    pub async fn current(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    /// Obtain a fresh credential and make it current.
    ///
    /// Demo scope returns the synthetic token without network I/O. Otherwise
    /// the API key is exchanged at the identity endpoint.
    pub async fn acquire(&self) -> Result<Credential, GatewayError> {
        let credential = match &self.scope {
            Scope::Demo => Credential::new(DEMO_TOKEN),
            Scope::ApiKey(key) => self.exchange(key).await?,
        };

        *self.current.write().await = Some(credential.clone());
        Ok(credential)
    }

    async fn exchange(&self, api_key: &str) -> Result<Credential, GatewayError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", APIKEY_GRANT_TYPE),
            ("apikey", api_key),
        ];
        // Cloud Pak for Data keys need the IAM-compatible response shape.
        if api_key.starts_with(CPD_KEY_PREFIX) {
            form.push(("response_type", "cloud_iam"));
        }

        debug!(iam_url = %self.iam_url, "requesting access token");

        let res = self
            .client
            .post(&self.iam_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(iam_url = %self.iam_url, error = %e, "token request failed (transport)");
                GatewayError::CredentialAcquisition(e.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_else(|_| "<unreadable body>".to_string());
            error!(%status, %body, "token request returned HTTP error");
            return Err(GatewayError::CredentialAcquisition(format!("HTTP {status}: {body}")));
        }

        let parsed = res.json::<TokenResponse>().await.map_err(|e| {
            error!(error = %e, "failed to parse token response");
            GatewayError::CredentialAcquisition(format!("failed to parse token response: {e}"))
        })?;

        let credential = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or_else(|| {
                GatewayError::CredentialAcquisition("token response has no access_token".into())
            })?;

        info!(token = %credential.preview(), "obtained access token");
        Ok(credential)
    }
}
