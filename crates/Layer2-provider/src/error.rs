//! Provider-specific error types
//!
//! - `ProviderError`: 어댑터 수준 에러 (HTTP, 인증, 빈 응답 등)
//! - `GatewayError`: 게이트웨이 수준 에러 (알 수 없는 프로바이더, 설정 누락)

use crate::retry::{RetryClassification, RetryableError};
use thiserror::Error;

/// Errors that can occur inside one provider adapter
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Context length exceeded
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network error (connection failed, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not found or not available
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Quota exceeded
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider not configured (no API key)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// The call succeeded but produced no usable text
    #[error("Empty response")]
    EmptyResponse,

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },

            ProviderError::ServerError(_) | ProviderError::Network(_) => RetryClassification::Retry,

            ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::QuotaExceeded(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::EmptyResponse
            | ProviderError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 | 413 => {
                if body.contains("context") || body.contains("too long") || body.contains("token")
                {
                    ProviderError::ContextLengthExceeded(body.to_string())
                } else {
                    ProviderError::InvalidRequest(body.to_string())
                }
            }
            404 => ProviderError::ModelNotFound(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    let idx = body.find("retry")?;
    let num_str: String = body[idx..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    num_str.parse::<f64>().ok().map(|secs| (secs * 1000.0) as u64)
}

// ============================================================================
// GatewayError
// ============================================================================

/// Errors surfaced by [`crate::Gateway`]
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The requested or configured provider is not registered
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),

    /// Model configuration could not be resolved (e.g. `ConfigNotFound`)
    #[error(transparent)]
    Config(#[from] thot_foundation::Error),

    /// Adapter-level failure, passed through unchanged
    #[error("{provider}: {cause}")]
    Provider {
        provider: String,
        #[source]
        cause: ProviderError,
    },

    /// The backend answered but produced nothing usable
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },
}

impl GatewayError {
    /// 어댑터 에러를 게이트웨이 에러로 변환 (빈 응답은 별도 분류)
    pub fn from_adapter(provider: impl Into<String>, cause: ProviderError) -> Self {
        let provider = provider.into();
        match cause {
            ProviderError::EmptyResponse => GatewayError::EmptyResponse { provider },
            cause => GatewayError::Provider { provider, cause },
        }
    }

    /// 재시도하면 성공할 수도 있는 에러인지 확인
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Provider { cause, .. } => {
                cause.classify() != RetryClassification::NoRetry
            }
            _ => false,
        }
    }
}
