//! Provider adapter trait
//!
//! 모든 백엔드가 구현하는 공통 인터페이스.
//! Adapters project a [`ModelConfig`] onto whatever their backend accepts
//! and drop the fields it does not support.

use crate::error::ProviderError;
use crate::prompts::CODE_SYSTEM_PROMPT;
use crate::Message;
use async_trait::async_trait;
use thot_foundation::ModelConfig;

/// LLM provider adapter
///
/// Implement this trait to add support for a new backend.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Registry id (e.g., "openai")
    fn id(&self) -> &str;

    /// Config section holding `api_key` / `default_model` (e.g., "OpenAI")
    fn config_section(&self) -> &str;

    /// Model used when the config section names none
    fn default_model(&self) -> &str;

    /// Check if the provider is usable (e.g., API key is set)
    fn is_available(&self) -> bool {
        true
    }

    /// Send the whole conversation and return the reply text
    ///
    /// Blank replies fail with [`ProviderError::EmptyResponse`].
    async fn chat_completion(
        &self,
        messages: &[Message],
        config: &ModelConfig,
    ) -> Result<String, ProviderError>;

    /// 단일 프롬프트로 코드 생성
    async fn generate_code(
        &self,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<String, ProviderError> {
        self.code_with_structure(prompt, CODE_SYSTEM_PROMPT, config)
            .await
    }

    /// 시스템 프롬프트를 지정하여 코드 생성
    async fn code_with_structure(
        &self,
        prompt: &str,
        system_prompt: &str,
        config: &ModelConfig,
    ) -> Result<String, ProviderError> {
        let messages = [Message::system(system_prompt), Message::user(prompt)];
        self.chat_completion(&messages, config).await
    }
}
