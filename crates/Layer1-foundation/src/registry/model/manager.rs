//! ModelConfigManager - 기본값 위에 저장된 오버라이드를 겹쳐 해석

use super::config::{section_name, split_section_name, ModelConfig};
use crate::config::ConfigStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves fully populated [`ModelConfig`] values for (provider, model)
/// pairs from persisted overrides, falling back to a built-in table.
///
/// Built-in entries are never mutated; overrides live only in the store.
#[derive(Debug, Clone)]
pub struct ModelConfigManager {
    store: Arc<ConfigStore>,
    builtins: Vec<(String, Vec<ModelConfig>)>,
}

impl ModelConfigManager {
    /// 내장 기본 테이블과 함께 생성
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            builtins: builtin_table(),
        }
    }

    /// 내장 테이블 없이 생성
    pub fn without_builtins(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            builtins: Vec::new(),
        }
    }

    /// 프로바이더의 내장 기본값 추가 (같은 모델 id 는 교체)
    pub fn with_builtin(mut self, config: ModelConfig) -> Self {
        let provider = config.provider.clone();
        let index = match self.builtins.iter().position(|(p, _)| *p == provider) {
            Some(index) => index,
            None => {
                self.builtins.push((provider, Vec::new()));
                self.builtins.len() - 1
            }
        };

        let models = &mut self.builtins[index].1;
        match models.iter_mut().find(|m| m.model == config.model) {
            Some(existing) => *existing = config,
            None => models.push(config),
        }
        self
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// 내장 기본값 조회
    pub fn builtin(&self, provider: &str, model: &str) -> Option<&ModelConfig> {
        self.builtins
            .iter()
            .find(|(p, _)| p == provider)
            .and_then(|(_, models)| models.iter().find(|m| m.model == model))
    }

    /// 저장된 오버라이드가 있는지 확인
    pub fn has_override(&self, provider: &str, model: &str) -> bool {
        self.store.has_section(&section_name(provider, model))
    }

    /// (provider, model) 설정 해석
    ///
    /// Fails with [`Error::ConfigNotFound`] only when neither an override
    /// nor a built-in default exists. Reads have no side effects.
    pub fn resolve(&self, provider: &str, model: &str) -> Result<ModelConfig> {
        let section = section_name(provider, model);
        if let Some(values) = self.store.section(&section) {
            debug!("Resolved {}/{} from persisted override", provider, model);
            return Ok(ModelConfig::from_section(provider, model, &values));
        }

        self.builtin(provider, model)
            .cloned()
            .ok_or_else(|| Error::config_not_found(provider, model))
    }

    /// 설정 저장 (섹션 생성 + 즉시 디스크 기록)
    ///
    /// All fields are written with one durable save; the call returns only
    /// after the store file has been replaced.
    pub fn persist(&self, config: &ModelConfig) -> Result<()> {
        config.validate()?;
        let section = config.section_name();
        self.store.set_many(&section, config.to_fields())?;
        info!("Persisted model config {}", section);
        Ok(())
    }

    /// 오버라이드 제거 (내장 기본값으로 복귀)
    pub fn reset(&self, provider: &str, model: &str) -> Result<bool> {
        self.store.remove_section(&section_name(provider, model))
    }

    /// 사용 가능한 모델 목록
    ///
    /// Built-in models come first in table order, followed by models that
    /// only exist as persisted overrides. An unknown provider filter yields
    /// an empty list for that provider.
    pub fn list_models(&self, provider: Option<&str>) -> BTreeMap<String, Vec<String>> {
        let mut listing: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (p, models) in &self.builtins {
            if provider.is_some_and(|wanted| wanted != p) {
                continue;
            }
            listing
                .entry(p.clone())
                .or_default()
                .extend(models.iter().map(|m| m.model.clone()));
        }

        for section in self.store.section_names() {
            let Some((p, model)) = split_section_name(&section) else {
                continue;
            };
            if provider.is_some_and(|wanted| wanted != p) {
                continue;
            }
            let models = listing.entry(p.to_string()).or_default();
            if !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }

        if let Some(wanted) = provider {
            listing.entry(wanted.to_string()).or_default();
        }

        listing
    }
}

/// 내장 기본 모델 테이블
fn builtin_table() -> Vec<(String, Vec<ModelConfig>)> {
    let entry = |provider: &str, model: &str, max_tokens: u32, context: u32| {
        ModelConfig::new(provider, model)
            .with_max_tokens(max_tokens)
            .with_context_window(context)
    };

    vec![
        (
            "openai".to_string(),
            vec![
                entry("openai", "gpt-4", 4096, 8192),
                entry("openai", "gpt-4-turbo", 4096, 128_000),
            ],
        ),
        (
            "anthropic".to_string(),
            vec![
                entry("anthropic", "claude-3-opus", 4096, 200_000),
                entry("anthropic", "claude-3-sonnet", 4096, 200_000),
            ],
        ),
        (
            "groq".to_string(),
            vec![entry("groq", "mixtral-8x7b-32768", 4096, 32_768)],
        ),
        (
            "gemini".to_string(),
            vec![entry("gemini", "gemini-pro", 4096, 32_768)],
        ),
    ]
}
