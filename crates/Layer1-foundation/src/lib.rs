//! # thot-foundation
//!
//! Foundation layer for Thot:
//! - Config: 섹션 기반 설정 저장소 (ConfigStore, TOML)
//! - Registry: 프로바이더 종류, 모델 파라미터 (ModelConfig, ModelConfigManager)
//! - Worker: 블로킹 작업 오프로딩 (WorkerPool)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Application root (thot-cli)             │
//! │      │ Arc<ConfigStore>                  │
//! │      ▼                                   │
//! │  ModelConfigManager ── Gateway ── Plugins│
//! │      │                                   │
//! │      ▼                                   │
//! │  ConfigStore (config.toml, 섹션 단위)     │
//! └──────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod worker;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ConfigStore, Section, CONFIG_FILE, DEFAULT_SECTION};

// ============================================================================
// Registry (레지스트리)
// ============================================================================
pub use registry::{ModelConfig, ModelConfigManager, ProviderKind};

// ============================================================================
// Worker (블로킹 작업)
// ============================================================================
pub use worker::{WorkerPool, DEFAULT_WORKERS};
