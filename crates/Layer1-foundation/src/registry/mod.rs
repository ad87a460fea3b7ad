//! Registry - 프로바이더/모델 등록 정보
//!
//! - `provider/` - 프로바이더 종류 (섹션 이름, 환경변수, 기본 모델)
//! - `model/` - 모델 파라미터 (ModelConfig, ModelConfigManager)

pub mod model;
pub mod provider;

// Provider
pub use provider::ProviderKind;

// Model
pub use model::{ModelConfig, ModelConfigManager};
