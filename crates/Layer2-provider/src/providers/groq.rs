//! Groq provider implementation
//!
//! Groq serves an OpenAI-compatible chat-completions endpoint but rejects
//! presence/frequency penalties, so those are left off the request.

use super::openai::{build_chat_request, extract_reply, parse_error_response, ChatResponse};
use super::{base_url_from_section, http_client, require_key, send_json, timeout_from_section};
use crate::{
    error::ProviderError,
    r#trait::ProviderAdapter,
    retry::{with_retry, RetryConfig},
    Message,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thot_foundation::{ConfigStore, ModelConfig, ProviderKind};

const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1";
const CHAT_PATH: &str = "/chat/completions";

/// Groq adapter
pub struct GroqAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl GroqAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(ProviderKind::Groq.default_timeout())),
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn from_store(store: &ConfigStore) -> Self {
        let kind = ProviderKind::Groq;
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
impl ProviderAdapter for GroqAdapter {
    fn id(&self) -> &str {
        ProviderKind::Groq.id()
    }

    fn config_section(&self) -> &str {
        ProviderKind::Groq.section()
    }

    fn default_model(&self) -> &str {
        ProviderKind::Groq.default_model()
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
        let request = build_chat_request(messages, config, false);
        let url = format!("{}{}", self.base_url, CHAT_PATH);

        let response: ChatResponse = with_retry(&self.retry, "groq chat", || {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::{body_json, serve_once};

    #[tokio::test]
    async fn test_penalties_are_not_sent() {
        let (url, server) =
            serve_once(200, r#"{"choices":[{"message":{"content":"fn main() {}"}}]}"#).await;
        let adapter = GroqAdapter::new("gsk-test").with_base_url(url);
        let config = ModelConfig::new("groq", "mixtral-8x7b-32768")
            .with_presence_penalty(1.0)
            .with_frequency_penalty(0.5)
            .with_max_tokens(4096);

        let reply = adapter.generate_code("hello world", &config).await.unwrap();
        assert_eq!(reply, "fn main() {}");

        let body = body_json(&server.await.unwrap());
        assert!(body.get("presence_penalty").is_none());
        assert!(body.get("frequency_penalty").is_none());
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello world");
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let (url, _server) = serve_once(400, r#"{"error":{"message":"bad model"}}"#).await;
        let adapter = GroqAdapter::new("gsk-test")
            .with_base_url(url)
            .with_retry(RetryConfig::no_retry());

        let err = adapter
            .chat_completion(&[Message::user("hi")], &ModelConfig::new("groq", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
