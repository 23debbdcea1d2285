//! Application-wide error types.
//!
//! [`GatewayError`] covers everything a single request can fail with;
//! [`AppError`] covers process bootstrap and server lifecycle.

use axum::http::StatusCode;
use thiserror::Error;

/// Per-request failure, surfaced to the HTTP caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad caller input.
    #[error("{0}")]
    Validation(String),

    /// The identity exchange failed; fatal for the current request.
    #[error("credential acquisition failed: {0}")]
    CredentialAcquisition(String),

    /// The inference call failed with something other than a recoverable 401.
    #[error("upstream call failed: {0}")]
    UpstreamCall(String),
}

impl GatewayError {
    /// HTTP status the adapter layer reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::CredentialAcquisition(_) | GatewayError::UpstreamCall(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("server error: {0}")]
    Server(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let e = GatewayError::Validation("Query is required".into());
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.to_string(), "Query is required");
    }

    #[test]
    fn gateway_failures_map_to_internal_error() {
        let acq = GatewayError::CredentialAcquisition("HTTP 400".into());
        let up = GatewayError::UpstreamCall("HTTP 503".into());
        assert_eq!(acq.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(up.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(acq.to_string().contains("HTTP 400"));
    }

    #[test]
    fn server_error_display() {
        let e = AppError::Server("failed to build HTTP client: no TLS backend".into());
        assert_eq!(e.to_string(), "server error: failed to build HTTP client: no TLS backend");
    }
}
