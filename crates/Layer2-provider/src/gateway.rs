//! LLM Gateway - routes requests to the selected provider adapter
//!
//! 요청마다 프로바이더 이름을 해석하고 (명시적 override 또는 설정된 기본값),
//! ModelConfigManager에서 파라미터를 받아 어댑터에 전달한다.
//! The gateway never retries and never falls back to another provider.

use crate::error::GatewayError;
use crate::prompts::PROJECT_SYSTEM_PROMPT;
use crate::providers::{
    anthropic::AnthropicAdapter, gemini::GeminiAdapter, groq::GroqAdapter, openai::OpenAiAdapter,
};
use crate::{Message, ProviderAdapter, ProviderError};
use std::collections::HashMap;
use std::sync::Arc;
use thot_foundation::{ConfigStore, ModelConfig, ModelConfigManager, ProviderKind, DEFAULT_SECTION};
use tracing::{debug, info, warn};

/// `DEFAULT` 섹션의 활성 프로바이더 키
pub const DEFAULT_PROVIDER_KEY: &str = "ai_provider";

/// Gateway that owns the provider registrations
pub struct Gateway {
    store: Arc<ConfigStore>,
    models: Arc<ModelConfigManager>,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    order: Vec<String>,
}

impl Gateway {
    /// Create an empty gateway (for testing or manual provider setup)
    pub fn new(store: Arc<ConfigStore>, models: Arc<ModelConfigManager>) -> Self {
        Self {
            store,
            models,
            providers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Gateway with the four built-in backends, configured from the store
    pub fn from_store(store: Arc<ConfigStore>, models: Arc<ModelConfigManager>) -> Self {
        let mut gateway = Self::new(Arc::clone(&store), models);
        gateway.register_provider(
            ProviderKind::OpenAi.id(),
            Arc::new(OpenAiAdapter::from_store(&store)),
        );
        gateway.register_provider(
            ProviderKind::Anthropic.id(),
            Arc::new(AnthropicAdapter::from_store(&store)),
        );
        gateway.register_provider(ProviderKind::Groq.id(), Arc::new(GroqAdapter::from_store(&store)));
        gateway.register_provider(
            ProviderKind::Gemini.id(),
            Arc::new(GeminiAdapter::from_store(&store)),
        );
        gateway
    }

    /// Register (or replace) an adapter under `name`
    pub fn register_provider(&mut self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let name = name.into();
        if self.providers.insert(name.clone(), adapter).is_some() {
            warn!("Provider '{}' re-registered, replacing previous adapter", name);
        } else {
            self.order.push(name.clone());
        }
        debug!("Registered provider '{}'", name);
    }

    /// Registered provider names, in registration order
    pub fn list_providers(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn get_provider(&self, name: &str) -> Result<Arc<dyn ProviderAdapter>, GatewayError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownProvider(name.to_string()))
    }

    /// Check if a provider is registered and usable
    pub fn is_provider_available(&self, name: &str) -> bool {
        self.providers
            .get(name)
            .map(|p| p.is_available())
            .unwrap_or(false)
    }

    pub fn models(&self) -> &Arc<ModelConfigManager> {
        &self.models
    }

    // ========================================================================
    // Default provider / model
    // ========================================================================

    /// 설정된 기본 프로바이더 이름 (호출 시점에 읽음)
    pub fn default_provider(&self) -> String {
        self.store
            .get(DEFAULT_SECTION, DEFAULT_PROVIDER_KEY)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ProviderKind::OpenAi.id().to_string())
    }

    /// Validate and persist a new default provider
    pub fn set_default_provider(&self, name: &str) -> Result<(), GatewayError> {
        self.get_provider(name)?;
        self.store.set(DEFAULT_SECTION, DEFAULT_PROVIDER_KEY, name)?;
        info!("Default provider set to '{}'", name);
        Ok(())
    }

    /// 프로바이더 섹션의 `default_model`, 없으면 어댑터 기본값
    pub fn model_for(&self, provider: &str) -> Result<String, GatewayError> {
        let adapter = self.get_provider(provider)?;
        let model = self
            .store
            .get(adapter.config_section(), "default_model")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| adapter.default_model().to_string());
        Ok(model)
    }

    /// Resolve provider name, adapter and model parameters for one call
    pub fn resolve(
        &self,
        provider_override: Option<&str>,
    ) -> Result<(String, Arc<dyn ProviderAdapter>, ModelConfig), GatewayError> {
        let name = match provider_override {
            Some(name) => name.to_string(),
            None => self.default_provider(),
        };
        let adapter = self.get_provider(&name)?;
        let model = self.model_for(&name)?;
        let config = self.models.resolve(&name, &model)?;
        Ok((name, adapter, config))
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// 대화 전체를 전달하고 응답 텍스트 반환
    pub async fn chat(
        &self,
        history: &[Message],
        provider: Option<&str>,
    ) -> Result<String, GatewayError> {
        let (name, adapter, config) = self.resolve(provider)?;
        debug!(provider = %name, model = %config.model, messages = history.len(), "chat");
        let result = adapter.chat_completion(history, &config).await;
        finish(&name, result)
    }

    /// 단일 코드 생성
    pub async fn generate_code(
        &self,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<String, GatewayError> {
        let (name, adapter, config) = self.resolve(provider)?;
        debug!(provider = %name, model = %config.model, "generate_code");
        let result = adapter.generate_code(prompt, &config).await;
        finish(&name, result)
    }

    /// `FOLDER:` / `FILE:` 형식의 프로젝트 구조 생성
    ///
    /// Parse the result with [`crate::ProjectSpec::parse`].
    pub async fn generate_project_spec(
        &self,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<String, GatewayError> {
        let (name, adapter, config) = self.resolve(provider)?;
        debug!(provider = %name, model = %config.model, "generate_project_spec");
        let result = adapter
            .code_with_structure(prompt, PROJECT_SYSTEM_PROMPT, &config)
            .await;
        finish(&name, result)
    }
}

/// 어댑터 결과를 게이트웨이 결과로 변환 (빈 응답 재검사)
fn finish(provider: &str, result: Result<String, ProviderError>) -> Result<String, GatewayError> {
    match result {
        Ok(text) if text.trim().is_empty() => Err(GatewayError::EmptyResponse {
            provider: provider.to_string(),
        }),
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("Provider '{}' failed: {}", provider, e);
            Err(GatewayError::from_adapter(provider, e))
        }
    }
}
