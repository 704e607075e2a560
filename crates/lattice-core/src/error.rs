//! Error taxonomy for the routing gateway.
//!
//! Every fallible path in the pipeline resolves to one of exactly eight
//! kinds. The kind, not the `Display` text, is the contract: it is what
//! gets serialized into the `"type"` field of the error envelope and what
//! decides HTTP status + whether the routing pipeline fails over to the
//! next candidate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream call to {provider} timed out")]
    Timeout { provider: String },
    #[error("upstream rate limit from {provider}")]
    RateLimit { provider: String },
    #[error("request rejected by {provider}: {detail}")]
    Validation { provider: String, detail: String },
    #[error("upstream {provider} failed: {detail}")]
    Internal { provider: String, detail: String },
    #[error("provider {provider} misconfigured: {detail}")]
    Configuration { provider: String, detail: String },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Timeout { provider }
            | ProviderError::RateLimit { provider }
            | ProviderError::Validation { provider, .. }
            | ProviderError::Internal { provider, .. }
            | ProviderError::Configuration { provider, .. } => provider,
        }
    }

    /// Whether the routing pipeline should try the next candidate rather
    /// than aborting the request outright.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. }
                | ProviderError::RateLimit { .. }
                | ProviderError::Internal { .. }
        )
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

#[derive(Debug, Error)]
#[error("rate limit exceeded for {consumer}, retry after {retry_after_secs}s")]
pub struct RateLimitError {
    pub consumer: String,
    pub retry_after_secs: u64,
}

impl GatewayError {
    /// The exact taxonomy string this error serializes as.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Request(_) => "request_validation",
            GatewayError::Provider(p) => match p {
                ProviderError::Timeout { .. } => "provider_timeout",
                ProviderError::RateLimit { .. } => "provider_rate_limit",
                ProviderError::Validation { .. } => "provider_validation",
                ProviderError::Internal { .. } => "provider_internal",
                ProviderError::Configuration { .. } => "configuration",
            },
            GatewayError::Config(_) => "configuration",
            GatewayError::RateLimit(_) => "rate_limit",
            GatewayError::Internal(_) => "internal_error",
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            GatewayError::Provider(p) => Some(p.provider()),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Request(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Provider(p) => match p {
                ProviderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ProviderError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
                ProviderError::Validation { .. } => StatusCode::BAD_REQUEST,
                ProviderError::Internal { .. } => StatusCode::BAD_GATEWAY,
                ProviderError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn request_validation(message: impl Into<String>) -> Self {
        GatewayError::Request(RequestError {
            message: message.into(),
        })
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        GatewayError::Config(ConfigError {
            message: message.into(),
        })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });
        if let Some(provider) = self.provider() {
            body["error"]["provider"] = json!(provider);
        }
        (status, Json(body)).into_response()
    }
}

/// Classifies a transport-level failure the same way the upstream call
/// site classifies HTTP status codes, so every adapter shares one mapping.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let provider = "unknown".to_string();
        if err.is_timeout() {
            return ProviderError::Timeout { provider };
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 429 {
                return ProviderError::RateLimit { provider };
            }
            if status.is_client_error() {
                return ProviderError::Validation {
                    provider,
                    detail: err.to_string(),
                };
            }
        }
        ProviderError::Internal {
            provider,
            detail: err.to_string(),
        }
    }
}
