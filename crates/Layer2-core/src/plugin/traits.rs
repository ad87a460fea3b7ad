//! Plugin traits - 핵심 플러그인 인터페이스

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thot_foundation::{ConfigStore, Result, Section};

/// 플러그인 설정 섹션 접두사
pub const PLUGIN_SECTION_PREFIX: &str = "Plugin.";

// ============================================================================
// PluginContext - 플러그인에 제공되는 컨텍스트
// ============================================================================

/// 플러그인 컨텍스트 - 이름과 설정 보기
///
/// Configuration is the manifest defaults overlaid by the store section
/// `Plugin.<name>`, read fresh on every call.
#[derive(Debug, Clone)]
pub struct PluginContext {
    name: String,
    store: Arc<ConfigStore>,
    defaults: Section,
}

impl PluginContext {
    pub fn new(name: impl Into<String>, store: Arc<ConfigStore>) -> Self {
        Self {
            name: name.into(),
            store,
            defaults: Section::new(),
        }
    }

    /// 매니페스트 기본값 설정
    pub fn with_defaults(mut self, defaults: Section) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// `Plugin.<name>`
    pub fn section_name(&self) -> String {
        format!("{}{}", PLUGIN_SECTION_PREFIX, self.name)
    }

    /// 유효 설정 (기본값 + 저장소 오버라이드)
    pub fn config(&self) -> Section {
        let mut merged = self.defaults.clone();
        if let Some(overrides) = self.store.section(&self.section_name()) {
            merged.extend(overrides);
        }
        merged
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store
            .get(&self.section_name(), key)
            .or_else(|| self.defaults.get(key).cloned())
    }
}

// ============================================================================
// PluginOutput - 실행 결과
// ============================================================================

/// 플러그인 실행 결과
///
/// Serialized with a `status` tag: `{"status":"success","data":...}` or
/// `{"status":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PluginOutput {
    Success {
        data: Value,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        example: Option<String>,
    },
}

impl PluginOutput {
    pub fn success(data: Value) -> Self {
        PluginOutput::Success { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        PluginOutput::Error {
            message: message.into(),
            example: None,
        }
    }

    /// 사용 예시를 포함한 에러
    pub fn error_with_example(message: impl Into<String>, example: impl Into<String>) -> Self {
        PluginOutput::Error {
            message: message.into(),
            example: Some(example.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PluginOutput::Success { .. })
    }
}

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// Instances are created by a [`PluginFactory`](super::PluginFactory) with
/// their [`PluginContext`], initialized once, and then shared read-only.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Registry name
    fn name(&self) -> &str {
        self.context().name()
    }

    /// One-line description for listings
    fn description(&self) -> &str {
        ""
    }

    /// Argument usage for `execute`
    fn usage(&self) -> &str {
        ""
    }

    fn context(&self) -> &PluginContext;

    /// 등록 전에 한 번 호출
    ///
    /// `Ok(false)` or `Err(_)` keeps the plugin out of the registry.
    async fn initialize(&mut self) -> Result<bool>;

    /// 플러그인 실행
    ///
    /// Failures are reported as [`PluginOutput::Error`], never as panics.
    async fn execute(&self, args: &[String]) -> PluginOutput;

    /// 현재 유효 설정
    fn describe_config(&self) -> Section {
        self.context().config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_overlay() {
        let store = Arc::new(ConfigStore::empty());
        let mut defaults = Section::new();
        defaults.insert("precision".into(), "2".into());
        defaults.insert("max_value".into(), "100".into());
        let ctx = PluginContext::new("Calc", Arc::clone(&store)).with_defaults(defaults);

        store.set("Plugin.Calc", "precision", "4").unwrap();

        let config = ctx.config();
        assert_eq!(config["precision"], "4");
        assert_eq!(config["max_value"], "100");
        assert_eq!(ctx.get("precision").as_deref(), Some("4"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_output_tagging() {
        let ok = serde_json::to_value(PluginOutput::success(serde_json::json!({"result": 3})))
            .unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["data"]["result"], 3);

        let err = serde_json::to_value(PluginOutput::error("Division by zero")).unwrap();
        assert_eq!(err, serde_json::json!({"status": "error", "message": "Division by zero"}));
    }
}
