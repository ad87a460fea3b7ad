//! # Plugin System
//!
//! Thot 확장 플러그인 시스템
//!
//! ## 아키텍처
//!
//! ```text
//! plugins/*.json ──scan──▶ PluginManifest ──factory──▶ Box<dyn Plugin>
//!                                                         │ initialize()
//!                                                         ▼
//!                                    PluginRegistry { name → Arc<dyn Plugin> }
//! ```
//!
//! Plugin kinds are registered explicitly with
//! [`PluginRegistry::register_factory`]; a manifest's `plugin` field picks
//! the factory.
//!
//! ## 예시
//!
//! ```ignore
//! let registry = PluginRegistry::from_store(store).with_builtins();
//! registry.discover_all().await;
//! let output = registry.execute("Calculator", &["add".into(), "1".into(), "2".into()]).await?;
//! ```

pub mod builtin;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod traits;

pub use error::{PluginError, PluginResult};
pub use manifest::PluginManifest;
pub use registry::{PluginFactory, PluginOutcome, PluginRegistry, PluginState, DEFAULT_PLUGIN_DIR};
pub use traits::{Plugin, PluginContext, PluginOutput, PLUGIN_SECTION_PREFIX};
