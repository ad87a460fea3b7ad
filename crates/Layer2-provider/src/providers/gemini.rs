//! Google Gemini provider implementation
//!
//! Gemini names the assistant role `model`, carries the system prompt in
//! `systemInstruction`, and has no presence/frequency penalties.

use super::{base_url_from_section, http_client, non_empty, require_key, send_json, timeout_from_section};
use crate::{
    error::ProviderError,
    message::join_system_prompts,
    r#trait::ProviderAdapter,
    retry::{with_retry, RetryConfig},
    Message, MessageRole,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thot_foundation::{ConfigStore, ModelConfig, ProviderKind};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini accepts at most this many stop sequences
const MAX_STOP_SEQUENCES: usize = 5;

/// Google Gemini adapter
pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(ProviderKind::Gemini.default_timeout())),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_store(store: &ConfigStore) -> Self {
        let kind = ProviderKind::Gemini;
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

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> &str {
        ProviderKind::Gemini.id()
    }

    fn config_section(&self) -> &str {
        ProviderKind::Gemini.section()
    }

    fn default_model(&self) -> &str {
        ProviderKind::Gemini.default_model()
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
        let url = self.endpoint(&config.model);

        let response: GenerateResponse = with_retry(&self.retry, "gemini chat", || {
            send_json(
                self.client
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())]),
                &request,
                parse_error_response,
            )
        })
        .await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!("Gemini blocked the prompt: {}", reason);
        }

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        non_empty(text)
    }
}

fn build_request(messages: &[Message], config: &ModelConfig) -> GenerateRequest {
    if config.stop_sequences.len() > MAX_STOP_SEQUENCES {
        debug!(
            "Only the first {} stop sequences are sent for {}",
            MAX_STOP_SEQUENCES, config.model
        );
    }
    let stop: Vec<String> = config
        .stop_sequences
        .iter()
        .take(MAX_STOP_SEQUENCES)
        .cloned()
        .collect();

    GenerateRequest {
        contents: messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| Content {
                role: Some(match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect(),
        system_instruction: join_system_prompts(messages).map(|text| Content {
            role: None,
            parts: vec![Part { text: Some(text) }],
        }),
        generation_config: GenerationConfig {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stop_sequences: (!stop.is_empty()).then_some(stop),
        },
    }
}

fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let message = envelope.error.message;
        if message.contains("API_KEY_INVALID") || message.contains("API key not valid") {
            return ProviderError::Authentication(message);
        }
        return match envelope.error.status.as_deref() {
            Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED") => {
                ProviderError::Authentication(message)
            }
            Some("RESOURCE_EXHAUSTED") => ProviderError::RateLimited {
                retry_after_ms: None,
            },
            Some("NOT_FOUND") => ProviderError::ModelNotFound(message),
            Some("UNAVAILABLE") | Some("INTERNAL") => ProviderError::ServerError(message),
            _ => ProviderError::from_http_status(status.as_u16(), &message),
        };
    }

    ProviderError::from_http_status(status.as_u16(), body)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    temperature: f64,
    top_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorData,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::{body_json, serve_once};

    #[test]
    fn test_request_projection() {
        let config = ModelConfig::new("gemini", "gemini-pro")
            .with_max_tokens(512)
            .with_top_p(0.9)
            .with_presence_penalty(0.4)
            .with_stop_sequences(["END"]);
        let messages = [
            Message::system("Be brief."),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("again"),
        ];

        let json = serde_json::to_value(build_request(&messages, &config)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(json["systemInstruction"].get("role").is_none());
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");

        let generation = &json["generationConfig"];
        assert_eq!(generation["maxOutputTokens"], 512);
        assert_eq!(generation["topP"], 0.9);
        assert_eq!(generation["stopSequences"], serde_json::json!(["END"]));
        assert!(generation.get("presencePenalty").is_none());
        assert!(generation.get("frequencyPenalty").is_none());
    }

    #[test]
    fn test_invalid_key_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            parse_error_response(reqwest::StatusCode::BAD_REQUEST, body),
            ProviderError::Authentication(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_content_round_trip() {
        let (url, server) = serve_once(
            200,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"print('hi')"}]}}]}"#,
        )
        .await;
        let adapter = GeminiAdapter::new("g-key").with_base_url(url);

        let reply = adapter
            .chat_completion(&[Message::user("hi")], &ModelConfig::new("gemini", "gemini-pro"))
            .await
            .unwrap();
        assert_eq!(reply, "print('hi')");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /models/gemini-pro:generateContent?key=g-key"));
        assert!(body_json(&raw)["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_empty_response() {
        let (url, _server) =
            serve_once(200, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).await;
        let adapter = GeminiAdapter::new("g-key").with_base_url(url);

        let err = adapter
            .chat_completion(&[Message::user("hi")], &ModelConfig::new("gemini", "gemini-pro"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }
}
