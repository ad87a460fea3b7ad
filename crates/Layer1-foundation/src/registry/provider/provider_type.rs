use crate::config::ConfigStore;
use serde::{Deserialize, Serialize};

/// 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Groq,
    Gemini,
}

impl ProviderKind {
    /// 등록 순서
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Groq,
        ProviderKind::Gemini,
    ];

    /// 레지스트리 식별자 (gateway/model 설정에서 사용)
    pub fn id(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }

    /// 자격 증명 섹션 이름
    pub fn section(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Groq => "Groq",
            Self::Gemini => "Gemini",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4",
            Self::Anthropic => "claude-3-sonnet",
            Self::Groq => "mixtral-8x7b-32768",
            Self::Gemini => "gemini-pro",
        }
    }

    /// 기본 타임아웃 (초)
    pub fn default_timeout(&self) -> u64 {
        match self {
            Self::Groq => 60,
            _ => 300,
        }
    }

    /// 새 설정 파일에 기록되는 자리표시자
    pub fn placeholder_api_key(&self) -> String {
        format!("your_{}_api_key", self.id())
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// API 키 결정
    ///
    /// The section's `api_key` wins unless it is empty or still the
    /// placeholder; then the environment variable is consulted.
    pub fn api_key(&self, store: &ConfigStore) -> Option<String> {
        let configured = store
            .get(self.section(), "api_key")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && *k != self.placeholder_api_key());

        configured.or_else(|| {
            std::env::var(self.env_var())
                .ok()
                .filter(|k| !k.trim().is_empty())
        })
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id() {
        assert_eq!(ProviderKind::from_id("groq"), Some(ProviderKind::Groq));
        assert_eq!(ProviderKind::from_id("Groq"), None);
    }

    #[test]
    fn test_placeholder_key_is_ignored() {
        let store = ConfigStore::in_memory();
        // in_memory() seeds placeholders; only the env var could satisfy this.
        let key = ProviderKind::Anthropic.api_key(&store);
        assert_eq!(key, std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.trim().is_empty()));
    }

    #[test]
    fn test_configured_key_wins() {
        let store = ConfigStore::in_memory();
        store.set("Gemini", "api_key", "  g-key ").unwrap();
        assert_eq!(ProviderKind::Gemini.api_key(&store).as_deref(), Some("g-key"));
    }
}
