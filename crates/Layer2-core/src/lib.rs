//! thot-core: Core Runtime for Thot
//!
//! Layer2 - 플러그인 런타임
//!
//! # 주요 모듈
//!
//! - `plugin`: 플러그인 발견, 초기화, 실행
//!
//! # 사용 예시
//!
//! ```ignore
//! use thot_core::PluginRegistry;
//!
//! let registry = PluginRegistry::from_store(store).with_builtins();
//! let loaded = registry.discover_all().await;
//! for name in registry.list_registered().await {
//!     println!("{name}");
//! }
//! ```

pub mod plugin;

pub use plugin::{
    Plugin, PluginContext, PluginError, PluginFactory, PluginManifest, PluginOutcome,
    PluginOutput, PluginRegistry, PluginResult, PluginState,
};
