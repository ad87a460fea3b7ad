//! ModelConfig - 모델별 생성 파라미터

use crate::config::Section;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;

const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
const PENALTY_RANGE: (f64, f64) = (-2.0, 2.0);

/// 설정 섹션 접두사 (`Models.<provider>.<model>`)
pub const MODEL_SECTION_PREFIX: &str = "Models.";

/// Fully resolved generation parameters for one (provider, model) pair
///
/// Numeric fields always carry a concrete value. `max_tokens` and
/// `context_window` use `None` for "unbounded", never zero, and an empty
/// `stop_sequences` means no stop sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub context_window: Option<u32>,
    pub stop_sequences: Vec<String>,
}

impl ModelConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            max_tokens: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            context_window: None,
            stop_sequences: Vec::new(),
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    /// 0 은 "제한 없음"
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = (tokens > 0).then_some(tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = penalty;
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    /// 0 은 "지정 안 됨"
    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = (tokens > 0).then_some(tokens);
        self
    }

    pub fn with_stop_sequences<I, S>(mut self, sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = sequences.into_iter().map(Into::into).collect();
        self
    }

    // ========================================================================
    // Validation / (de)serialization
    // ========================================================================

    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() || self.model.trim().is_empty() {
            return Err(Error::Validation(
                "provider and model must not be empty".to_string(),
            ));
        }
        check_range("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_range("top_p", self.top_p, TOP_P_RANGE)?;
        check_range("presence_penalty", self.presence_penalty, PENALTY_RANGE)?;
        check_range("frequency_penalty", self.frequency_penalty, PENALTY_RANGE)?;
        Ok(())
    }

    /// 이 설정이 저장되는 섹션 이름
    pub fn section_name(&self) -> String {
        section_name(&self.provider, &self.model)
    }

    /// 저장용 문자열 필드
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("max_tokens", optional_to_string(self.max_tokens)),
            ("temperature", self.temperature.to_string()),
            ("top_p", self.top_p.to_string()),
            ("presence_penalty", self.presence_penalty.to_string()),
            ("frequency_penalty", self.frequency_penalty.to_string()),
            ("context_window", optional_to_string(self.context_window)),
            ("stop_sequences", encode_stop_sequences(&self.stop_sequences)),
        ]
    }

    /// 저장된 섹션에서 복원
    ///
    /// Every field is parsed on its own: a missing, unparsable or
    /// out-of-range value falls back to its default without affecting the
    /// other fields.
    pub fn from_section(provider: &str, model: &str, section: &Section) -> Self {
        let float = |key: &str, default: f64, range: (f64, f64)| -> f64 {
            match section.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                None => default,
                Some(raw) => match raw.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= range.0 && v <= range.1 => v,
                    _ => {
                        warn!("Invalid {} '{}' for {}/{}, using {}", key, raw, provider, model, default);
                        default
                    }
                },
            }
        };
        let bound = |key: &str| -> Option<u32> {
            let raw = section.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())?;
            match raw.parse::<u32>() {
                Ok(0) => None,
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Invalid {} '{}' for {}/{}, treating as unbounded", key, raw, provider, model);
                    None
                }
            }
        };

        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            max_tokens: bound("max_tokens"),
            temperature: float("temperature", DEFAULT_TEMPERATURE, TEMPERATURE_RANGE),
            top_p: float("top_p", DEFAULT_TOP_P, TOP_P_RANGE),
            presence_penalty: float("presence_penalty", DEFAULT_PRESENCE_PENALTY, PENALTY_RANGE),
            frequency_penalty: float("frequency_penalty", DEFAULT_FREQUENCY_PENALTY, PENALTY_RANGE),
            context_window: bound("context_window"),
            stop_sequences: section
                .get("stop_sequences")
                .map(|raw| decode_stop_sequences(raw))
                .unwrap_or_default(),
        }
    }

    /// 단일 필드를 문자열 값으로 갱신 (설정 UI 용)
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let parse_f64 = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| Error::Validation(format!("{} must be a number, got '{}'", field, v)))
        };
        let parse_bound = |v: &str| -> Result<Option<u32>> {
            if v.is_empty() || v.eq_ignore_ascii_case("none") {
                return Ok(None);
            }
            let n = v
                .parse::<u32>()
                .map_err(|_| Error::Validation(format!("{} must be a positive integer, got '{}'", field, v)))?;
            Ok((n > 0).then_some(n))
        };

        let mut next = self.clone();
        match field {
            "max_tokens" => next.max_tokens = parse_bound(value)?,
            "context_window" => next.context_window = parse_bound(value)?,
            "temperature" => next.temperature = parse_f64(value)?,
            "top_p" => next.top_p = parse_f64(value)?,
            "presence_penalty" => next.presence_penalty = parse_f64(value)?,
            "frequency_penalty" => next.frequency_penalty = parse_f64(value)?,
            "stop_sequences" => next.stop_sequences = decode_stop_sequences(value),
            other => {
                return Err(Error::Validation(format!("Unknown model field: {}", other)));
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

pub fn section_name(provider: &str, model: &str) -> String {
    format!("{}{}.{}", MODEL_SECTION_PREFIX, provider, model)
}

/// `Models.<provider>.<model>` → (provider, model)
///
/// Provider ids never contain dots; model ids may (`gpt-3.5-turbo`).
pub fn split_section_name(section: &str) -> Option<(&str, &str)> {
    let rest = section.strip_prefix(MODEL_SECTION_PREFIX)?;
    let (provider, model) = rest.split_once('.')?;
    (!provider.is_empty() && !model.is_empty()).then_some((provider, model))
}

fn check_range(name: &str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

fn optional_to_string(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Comma separated unless a sequence itself needs quoting, then a JSON array.
fn encode_stop_sequences(sequences: &[String]) -> String {
    let needs_json = sequences
        .iter()
        .any(|s| s.is_empty() || s.contains(',') || s.starts_with('['));
    if needs_json {
        serde_json::to_string(sequences).unwrap_or_default()
    } else {
        sequences.join(",")
    }
}

fn decode_stop_sequences(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
            return list;
        }
    }
    raw.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: &[(&str, &str)]) -> Section {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_concrete() {
        let config = ModelConfig::new("openai", "gpt-4");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 1.0);
        assert_eq!(config.presence_penalty, 0.0);
        assert_eq!(config.frequency_penalty, 0.0);
        assert_eq!(config.max_tokens, None);
        assert!(config.stop_sequences.is_empty());
    }

    #[test]
    fn test_bad_field_does_not_poison_record() {
        let parsed = ModelConfig::from_section(
            "openai",
            "gpt-4",
            &section(&[("temperature", "hot"), ("top_p", "0.5"), ("max_tokens", "0")]),
        );
        assert_eq!(parsed.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(parsed.top_p, 0.5);
        assert_eq!(parsed.max_tokens, None);
    }

    #[test]
    fn test_out_of_range_falls_back() {
        let parsed = ModelConfig::from_section(
            "openai",
            "gpt-4",
            &section(&[("temperature", "3.5"), ("presence_penalty", "-2.0")]),
        );
        assert_eq!(parsed.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(parsed.presence_penalty, -2.0);
    }

    #[test]
    fn test_stop_sequences_with_commas_use_json() {
        let config = ModelConfig::new("groq", "m").with_stop_sequences(["a,b", "END"]);
        let fields = config.to_fields();
        let (_, encoded) = fields.iter().find(|(k, _)| *k == "stop_sequences").unwrap();
        assert_eq!(encoded, r#"["a,b","END"]"#);
        assert_eq!(decode_stop_sequences(encoded), vec!["a,b", "END"]);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = ModelConfig::new("openai", "gpt-4").with_top_p(1.5);
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_split_section_name_keeps_dotted_model() {
        assert_eq!(
            split_section_name("Models.openai.gpt-3.5-turbo"),
            Some(("openai", "gpt-3.5-turbo"))
        );
        assert_eq!(split_section_name("OpenAI"), None);
        assert_eq!(split_section_name("Models.openai"), None);
    }

    #[test]
    fn test_set_field() {
        let mut config = ModelConfig::new("openai", "gpt-4");
        config.set_field("max_tokens", "none").unwrap();
        config.set_field("temperature", "1.1").unwrap();
        assert_eq!(config.max_tokens, None);
        assert_eq!(config.temperature, 1.1);
        assert!(config.set_field("temperature", "9").is_err());
        assert_eq!(config.temperature, 1.1);
        assert!(config.set_field("seed", "1").is_err());
    }
}
