//! Error types for Thot
//!
//! 설정/저장소 관련 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Thot 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    /// No persisted override and no built-in default for this pair
    #[error("No configuration found for {provider} model: {model}")]
    ConfigNotFound { provider: String, model: String },

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 설정 누락 에러 생성 헬퍼
    pub fn config_not_found(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Error::ConfigNotFound {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    ///
    /// Setup problems the operator can fix by editing configuration.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::ConfigNotFound { .. } | Error::Validation(_) | Error::Cancelled
        )
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_message() {
        let err = Error::config_not_found("openai", "gpt-9");
        assert_eq!(err.to_string(), "No configuration found for openai model: gpt-9");
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_internal_is_not_user_facing() {
        let err: Error = "boom".into();
        assert!(!err.is_user_facing());
    }
}
