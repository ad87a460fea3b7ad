//! Model Registry - 모델별 생성 파라미터 관리
//!
//! - `config.rs` - ModelConfig 값 타입 (기본값, 검증, 문자열 직렬화)
//! - `manager.rs` - ModelConfigManager (내장 기본값 + 저장된 오버라이드)

mod config;
mod manager;

pub use config::{
    section_name, split_section_name, ModelConfig, DEFAULT_FREQUENCY_PENALTY,
    DEFAULT_PRESENCE_PENALTY, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, MODEL_SECTION_PREFIX,
};
pub use manager::ModelConfigManager;
