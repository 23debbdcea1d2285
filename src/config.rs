//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the file named by `GATEWAY_CONFIG`),
//! then applies the env overrides `DEPLOYMENT_ID`, `WATSON_ML_URL`,
//! `IAM_URL`, `VERSION`, `PORT` and `GATEWAY_LOG_LEVEL`. The scope-selector
//! comes from `API_KEY` only and is never read from TOML.

use std::{env, fmt, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

/// Value of `API_KEY` that selects the local simulator.
pub const DEMO_SENTINEL: &str = "DEMO_MODE";

/// Which credential scope this process runs against.
///
/// Parsed once from `API_KEY`; nothing downstream compares against the
/// sentinel string.
#[derive(Clone, PartialEq, Eq)]
pub enum Scope {
    Demo,
    ApiKey(String),
}

impl Scope {
    /// `DEMO_MODE`, unset or blank selects [`Scope::Demo`].
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector.map(str::trim) {
            None | Some("") | Some(DEMO_SENTINEL) => Scope::Demo,
            Some(key) => Scope::ApiKey(key.to_string()),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Scope::Demo)
    }
}

// API keys stay out of logs.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Demo => f.write_str("Demo"),
            Scope::ApiKey(key) => {
                let head: String = key.chars().take(10).collect();
                write!(f, "ApiKey({head}...)")
            }
        }
    }
}

/// HTTP listener configuration (`[server]`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Reported by `GET /health`.
    pub service_name: String,
    pub bind: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Upstream endpoints and transport settings (`[watson]`).
#[derive(Debug, Clone)]
pub struct WatsonConfig {
    pub deployment_id: String,
    /// Deployments base URL, e.g. `https://us-south.ml.cloud.ibm.com/ml/v4/deployments`.
    pub watson_ml_url: String,
    /// Identity token endpoint.
    pub iam_url: String,
    /// Value of the `version` query parameter.
    pub version: String,
    /// Per-request HTTP timeout applied by the transport.
    pub timeout_seconds: u64,
    /// Simulated latency for demo responses.
    pub demo_latency_ms: u64,
}

impl WatsonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn demo_latency(&self) -> Duration {
        Duration::from_millis(self.demo_latency_ms)
    }

    /// `<watson_ml_url>/<deployment_id>/ai_service?version=<version>`
    pub fn scoring_url(&self) -> String {
        format!(
            "{}/{}/ai_service?version={}",
            self.watson_ml_url.trim_end_matches('/'),
            self.deployment_id,
            self.version
        )
    }
}

/// Fully-resolved gateway configuration. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub scope: Scope,
    pub server: ServerConfig,
    pub watson: WatsonConfig,
}

/// Env-sourced values layered over the TOML file.
///
/// [`load`] fills this from the process environment; tests build it directly.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub deployment_id: Option<String>,
    pub watson_ml_url: Option<String>,
    pub iam_url: Option<String>,
    pub version: Option<String>,
    pub port: Option<String>,
    pub log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("API_KEY").ok(),
            deployment_id: env::var("DEPLOYMENT_ID").ok(),
            watson_ml_url: env::var("WATSON_ML_URL").ok(),
            iam_url: env::var("IAM_URL").ok(),
            version: env::var("VERSION").ok(),
            port: env::var("PORT").ok(),
            log_level: env::var("GATEWAY_LOG_LEVEL").ok(),
        }
    }
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    watson: RawWatson,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_service_name")]
    service_name: String,
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bind: default_bind(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize)]
struct RawWatson {
    #[serde(default)]
    deployment_id: String,
    #[serde(default = "default_watson_ml_url")]
    watson_ml_url: String,
    #[serde(default = "default_iam_url")]
    iam_url: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_demo_latency_ms")]
    demo_latency_ms: u64,
}

impl Default for RawWatson {
    fn default() -> Self {
        Self {
            deployment_id: String::new(),
            watson_ml_url: default_watson_ml_url(),
            iam_url: default_iam_url(),
            version: default_version(),
            timeout_seconds: default_timeout_seconds(),
            demo_latency_ms: default_demo_latency_ms(),
        }
    }
}

fn default_service_name() -> String { "Watson ML Research Agent (Rust)".to_string() }
fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3001 }
fn default_log_level() -> String { "info".to_string() }
fn default_watson_ml_url() -> String { "https://us-south.ml.cloud.ibm.com/ml/v4/deployments".to_string() }
fn default_iam_url() -> String { "https://iam.cloud.ibm.com/identity/token".to_string() }
fn default_version() -> String { "2021-05-01".to_string() }
fn default_timeout_seconds() -> u64 { 30 }
fn default_demo_latency_ms() -> u64 { 1000 }

/// Load config from `GATEWAY_CONFIG` or `config/default.toml`, then apply
/// env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
    load_from(Path::new(&path), &EnvOverrides::from_env())
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let s = parsed.server;
    let w = parsed.watson;

    let port = match overrides.port.as_deref() {
        Some(p) => p
            .trim()
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("invalid PORT '{p}': {e}")))?,
        None => s.port,
    };

    let log_level = overrides.log_level.clone().unwrap_or(s.log_level);
    logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("invalid log_level: {e}")))?;

    let scope = Scope::from_selector(overrides.api_key.as_deref());

    let watson = WatsonConfig {
        deployment_id: overrides.deployment_id.clone().unwrap_or(w.deployment_id),
        watson_ml_url: overrides.watson_ml_url.clone().unwrap_or(w.watson_ml_url),
        iam_url: overrides.iam_url.clone().unwrap_or(w.iam_url),
        version: overrides.version.clone().unwrap_or(w.version),
        timeout_seconds: w.timeout_seconds,
        demo_latency_ms: w.demo_latency_ms,
    };

    if !scope.is_demo() && watson.deployment_id.trim().is_empty() {
        return Err(AppError::Config(
            "DEPLOYMENT_ID (or [watson].deployment_id) is required when API_KEY is set".into(),
        ));
    }

    Ok(Config {
        log_level,
        scope,
        server: ServerConfig {
            service_name: s.service_name,
            bind: s.bind,
            port,
        },
        watson,
    })
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: demo scope, no latency, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            log_level: "info".into(),
            scope: Scope::Demo,
            server: ServerConfig {
                service_name: "test-gateway".into(),
                bind: "127.0.0.1".into(),
                port: 0,
            },
            watson: WatsonConfig {
                deployment_id: "test-deployment".into(),
                watson_ml_url: "http://127.0.0.1:0/ml/v4/deployments".into(),
                iam_url: "http://127.0.0.1:0/identity/token".into(),
                version: "2021-05-01".into(),
                timeout_seconds: 5,
                demo_latency_ms: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[server]
port = 4000

[watson]
deployment_id = "dep-123"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_fills_defaults() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.watson.deployment_id, "dep-123");
        assert_eq!(cfg.watson.version, "2021-05-01");
        assert_eq!(cfg.watson.timeout_seconds, 30);
        assert_eq!(cfg.watson.demo_latency(), Duration::from_millis(1000));
    }

    #[test]
    fn empty_file_is_valid_demo_config() {
        let f = write_toml("");
        let cfg = load_from(f.path(), &EnvOverrides::default()).unwrap();
        assert!(cfg.scope.is_demo());
        assert_eq!(cfg.server.port, 3001);
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), &EnvOverrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_overrides_win_over_toml() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = EnvOverrides {
            api_key: Some("real-key".into()),
            deployment_id: Some("dep-env".into()),
            watson_ml_url: Some("http://localhost:9/deployments".into()),
            iam_url: Some("http://localhost:9/token".into()),
            version: Some("2024-01-01".into()),
            port: Some("5055".into()),
            log_level: Some("debug".into()),
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.scope, Scope::ApiKey("real-key".into()));
        assert_eq!(cfg.watson.deployment_id, "dep-env");
        assert_eq!(cfg.watson.iam_url, "http://localhost:9/token");
        assert_eq!(cfg.server.port, 5055);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(
            cfg.watson.scoring_url(),
            "http://localhost:9/deployments/dep-env/ai_service?version=2024-01-01"
        );
    }

    #[test]
    fn invalid_port_errors() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = EnvOverrides { port: Some("eighty".into()), ..Default::default() };
        assert!(load_from(f.path(), &overrides).is_err());
    }

    #[test]
    fn invalid_log_level_errors() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = EnvOverrides { log_level: Some("verbose".into()), ..Default::default() };
        assert!(load_from(f.path(), &overrides).is_err());
    }

    #[test]
    fn api_key_without_deployment_errors() {
        let f = write_toml("");
        let overrides = EnvOverrides { api_key: Some("real-key".into()), ..Default::default() };
        let msg = load_from(f.path(), &overrides).unwrap_err().to_string();
        assert!(msg.contains("DEPLOYMENT_ID"));
    }

    #[test]
    fn scope_selector_parsing() {
        assert_eq!(Scope::from_selector(Some("DEMO_MODE")), Scope::Demo);
        assert_eq!(Scope::from_selector(None), Scope::Demo);
        assert_eq!(Scope::from_selector(Some("  ")), Scope::Demo);
        assert_eq!(Scope::from_selector(Some("abc")), Scope::ApiKey("abc".into()));
    }

    #[test]
    fn scope_debug_hides_key() {
        let s = format!("{:?}", Scope::ApiKey("cpd-apikey-IBMid-secret-value".into()));
        assert!(!s.contains("secret-value"));
        assert!(s.starts_with("ApiKey(cpd-apikey"));
    }

    #[test]
    fn scoring_url_tolerates_trailing_slash() {
        let mut cfg = Config::test_default();
        cfg.watson.watson_ml_url = "http://host/deployments/".into();
        assert_eq!(
            cfg.watson.scoring_url(),
            "http://host/deployments/test-deployment/ai_service?version=2021-05-01"
        );
    }
}
