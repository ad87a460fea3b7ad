//! Anthropic (Claude) provider implementation
//!
//! The Messages API carries the system prompt outside the message list,
//! requires `max_tokens`, and has no presence/frequency penalties.

use super::{base_url_from_section, http_client, non_empty, require_key, send_json, timeout_from_section};
use crate::{
    error::ProviderError,
    message::join_system_prompts,
    r#trait::ProviderAdapter,
    retry::{with_retry, RetryConfig},
    Message,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thot_foundation::{ConfigStore, ModelConfig, ProviderKind};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const MESSAGES_PATH: &str = "/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sent when the model config leaves `max_tokens` unbounded
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic temperature range is [0, 1]
const MAX_TEMPERATURE: f64 = 1.0;

/// Anthropic Claude adapter
pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(ProviderKind::Anthropic.default_timeout())),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_store(store: &ConfigStore) -> Self {
        let kind = ProviderKind::Anthropic;
        let section = store.section(kind.section());
        let mut adapter = Self::new(kind.api_key(store).unwrap_or_default())
            .with_timeout(timeout_from_section(section.as_ref(), kind.default_timeout()))
            .with_retry(RetryConfig::from_section(section.as_ref()));
        if let Some(url) = base_url_from_section(section.as_ref()) {
            adapter = adapter.with_base_url(url);
        }
        adapter
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &str {
        ProviderKind::Anthropic.id()
    }

    fn config_section(&self) -> &str {
        ProviderKind::Anthropic.section()
    }

    fn default_model(&self) -> &str {
        ProviderKind::Anthropic.default_model()
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn chat_completion(
        &self,
        messages: &[Message],
        config: &ModelConfig,
    ) -> Result<String, ProviderError> {
        require_key(self.id(), &self.api_key)?;
        let request = build_request(messages, config);
        let url = format!("{}{}", self.base_url, MESSAGES_PATH);

        let response: MessagesResponse = with_retry(&self.retry, "anthropic chat", || {
            send_json(
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION),
                &request,
                parse_error_response,
            )
        })
        .await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();
        non_empty(text)
    }
}

/// Short model names resolve to dated API ids
fn api_model_id(model: &str) -> &str {
    match model {
        "claude-3-opus" => "claude-3-opus-20240229",
        "claude-3-sonnet" => "claude-3-sonnet-20240229",
        "claude-3-haiku" => "claude-3-haiku-20240307",
        other => other,
    }
}

fn build_request(messages: &[Message], config: &ModelConfig) -> MessagesRequest {
    if config.temperature > MAX_TEMPERATURE {
        debug!(
            "Clamping temperature {} to {} for {}",
            config.temperature, MAX_TEMPERATURE, config.model
        );
    }

    // Whitespace-only stop sequences are rejected by the API
    let stop: Vec<String> = config
        .stop_sequences
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect();

    MessagesRequest {
        model: api_model_id(&config.model).to_string(),
        max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system: join_system_prompts(messages),
        messages: messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect(),
        temperature: config.temperature.min(MAX_TEMPERATURE),
        top_p: config.top_p,
        stop_sequences: (!stop.is_empty()).then_some(stop),
    }
}

fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = envelope.error.message;
        return match envelope.error.error_type.as_str() {
            "authentication_error" | "permission_error" => ProviderError::Authentication(message),
            "rate_limit_error" => ProviderError::RateLimited {
                retry_after_ms: None,
            },
            "overloaded_error" | "api_error" => ProviderError::ServerError(message),
            "not_found_error" => ProviderError::ModelNotFound(message),
            _ => ProviderError::from_http_status(status.as_u16(), &message),
        };
    }

    ProviderError::from_http_status(status.as_u16(), body)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorData,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
