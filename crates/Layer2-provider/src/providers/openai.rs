//! OpenAI provider implementation
//!
//! The chat-completions wire types here are shared with the Groq adapter,
//! which speaks the same protocol.

use super::{base_url_from_section, http_client, non_empty, require_key, send_json, timeout_from_section};
use crate::{
    error::ProviderError,
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

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
const CHAT_PATH: &str = "/chat/completions";

/// OpenAI accepts at most this many stop sequences
pub(crate) const MAX_STOP_SEQUENCES: usize = 4;

/// OpenAI chat-completions adapter
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(ProviderKind::OpenAi.default_timeout())),
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// `[OpenAI]` 섹션에서 api_key / base_url / timeout / max_retries 로드
    pub fn from_store(store: &ConfigStore) -> Self {
        let kind = ProviderKind::OpenAi;
        let section = store.section(kind.section());
        let mut adapter = Self::new(kind.api_key(store).unwrap_or_default())
            .with_timeout(timeout_from_section(section.as_ref(), kind.default_timeout()))
            .with_retry(RetryConfig::from_section(section.as_ref()));
        if let Some(url) = base_url_from_section(section.as_ref()) {
            adapter = adapter.with_base_url(url);
        }
        adapter
    }

    /// Custom base URL (for OpenAI-compatible APIs like Azure, LocalAI, etc.)
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
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> &str {
        ProviderKind::OpenAi.id()
    }

    fn config_section(&self) -> &str {
        ProviderKind::OpenAi.section()
    }

    fn default_model(&self) -> &str {
        ProviderKind::OpenAi.default_model()
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
        let request = build_chat_request(messages, config, true);
        let url = format!("{}{}", self.base_url, CHAT_PATH);

        let response: ChatResponse = with_retry(&self.retry, "openai chat", || {
            send_json(
                self.client.post(&url).bearer_auth(&self.api_key),
                &request,
                parse_error_response,
            )
        })
        .await?;

        extract_reply(response)
    }
}

// ============================================================================
// Wire types (shared with Groq)
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub temperature: f64,
    pub top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// ModelConfig를 chat-completions 요청으로 변환
///
/// `penalties == false` drops presence/frequency penalty for backends that
/// reject them. Context window never goes on the wire.
pub(crate) fn build_chat_request(
    messages: &[Message],
    config: &ModelConfig,
    penalties: bool,
) -> ChatRequest {
    let stop = if config.stop_sequences.is_empty() {
        None
    } else {
        if config.stop_sequences.len() > MAX_STOP_SEQUENCES {
            debug!(
                "Only the first {} stop sequences are sent for {}",
                MAX_STOP_SEQUENCES, config.model
            );
        }
        Some(
            config
                .stop_sequences
                .iter()
                .take(MAX_STOP_SEQUENCES)
                .cloned()
                .collect(),
        )
    };

    ChatRequest {
        model: config.model.clone(),
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: m.content.clone(),
            })
            .collect(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        presence_penalty: penalties.then_some(config.presence_penalty),
        frequency_penalty: penalties.then_some(config.frequency_penalty),
        stop,
    }
}

/// 첫 번째 choice의 텍스트 (없거나 비면 EmptyResponse)
pub(crate) fn extract_reply(response: ChatResponse) -> Result<String, ProviderError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    non_empty(content)
}

pub(crate) fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        let error = error_response.error;
        let message = error.message;

        return match error.code.as_deref() {
            Some("rate_limit_exceeded") => ProviderError::from_http_status(429, &message),
            Some("context_length_exceeded") => ProviderError::ContextLengthExceeded(message),
            Some("invalid_api_key") => ProviderError::Authentication(message),
            Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
            Some("model_not_found") => ProviderError::ModelNotFound(message),
            _ => ProviderError::from_http_status(status.as_u16(), &message),
        };
    }

    ProviderError::from_http_status(status.as_u16(), body)
}
