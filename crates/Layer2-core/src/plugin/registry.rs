//! Plugin Registry - 발견, 초기화, 인덱싱, 실행
//!
//! Per candidate file:
//!
//! ```text
//! Discovered ──load──▶ Initializing ──initialize()──▶ Registered
//!      │                     │
//!      └──▶ Failed(Load | NoPluginFound)    └──▶ Failed(Init)
//! ```
//!
//! Every failure is logged, recorded in [`PluginRegistry::outcomes`], and
//! skipped; discovery always continues with the next candidate.

use super::builtin;
use super::discovery::scan_plugin_directory;
use super::error::{PluginError, PluginResult};
use super::manifest::PluginManifest;
use super::traits::{Plugin, PluginContext, PluginOutput};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thot_foundation::{ConfigStore, Section, DEFAULT_SECTION};
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// 기본 플러그인 디렉토리
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

/// Builds a plugin instance for one manifest
pub type PluginFactory = Arc<dyn Fn(PluginContext) -> Box<dyn Plugin> + Send + Sync>;

// ============================================================================
// Lifecycle
// ============================================================================

/// 후보별 라이프사이클 상태
#[derive(Debug, Clone, PartialEq)]
pub enum PluginState {
    Discovered,
    Initializing,
    Registered,
    Failed(PluginError),
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::Initializing => write!(f, "initializing"),
            Self::Registered => write!(f, "registered"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// 마지막 discover_all의 후보별 결과
#[derive(Debug, Clone, PartialEq)]
pub struct PluginOutcome {
    pub path: PathBuf,
    /// Known once the manifest parsed
    pub name: Option<String>,
    pub state: PluginState,
}

/// 등록된 플러그인 정보
struct PluginInfo {
    plugin: Arc<dyn Plugin>,
    load_order: usize,
}

/// Aborts a spawned plugin task when the caller stops waiting
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// ============================================================================
// PluginRegistry
// ============================================================================

/// 플러그인 레지스트리
pub struct PluginRegistry {
    store: Arc<ConfigStore>,
    plugin_dir: PathBuf,
    factories: HashMap<String, PluginFactory>,
    plugins: RwLock<HashMap<String, PluginInfo>>,
    load_counter: RwLock<usize>,
    outcomes: RwLock<Vec<PluginOutcome>>,
}

impl PluginRegistry {
    pub fn new(store: Arc<ConfigStore>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            plugin_dir: plugin_dir.into(),
            factories: HashMap::new(),
            plugins: RwLock::new(HashMap::new()),
            load_counter: RwLock::new(0),
            outcomes: RwLock::new(Vec::new()),
        }
    }

    /// `DEFAULT.plugin_dir` 사용
    pub fn from_store(store: Arc<ConfigStore>) -> Self {
        let dir = store.get_or(DEFAULT_SECTION, "plugin_dir", DEFAULT_PLUGIN_DIR);
        Self::new(store, dir)
    }

    /// 내장 팩토리 등록 (calculator, web_search, arxiv)
    pub fn with_builtins(mut self) -> Self {
        self.register_factory(builtin::calculator::KIND, builtin::calculator::factory());
        self.register_factory(builtin::web_search::KIND, builtin::web_search::factory());
        self.register_factory(builtin::arxiv::KIND, builtin::arxiv::factory());
        self
    }

    /// 매니페스트의 `plugin` 값에 대응하는 팩토리 등록
    pub fn register_factory(&mut self, kind: impl Into<String>, factory: PluginFactory) {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            warn!("Plugin factory '{}' replaced", kind);
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// 등록된 팩토리 종류 (정렬됨)
    pub fn factory_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// 플러그인 디렉토리 전체 스캔 후 등록
    ///
    /// Replaces the previous registry contents. Returns the number of
    /// registered plugins. Never fails.
    pub async fn discover_all(&self) -> usize {
        self.plugins.write().await.clear();
        *self.load_counter.write().await = 0;

        let candidates = match scan_plugin_directory(&self.plugin_dir).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(
                    "Failed to scan plugin directory {}: {}",
                    self.plugin_dir.display(),
                    e
                );
                Vec::new()
            }
        };

        let mut outcomes = Vec::with_capacity(candidates.len());
        for path in candidates {
            debug!(path = %path.display(), state = %PluginState::Discovered, "plugin candidate");
            let outcome = self.load_candidate(&path).await;
            if let PluginState::Failed(e) = &outcome.state {
                warn!("Skipping plugin candidate {}: {}", path.display(), e);
            }
            outcomes.push(outcome);
        }
        *self.outcomes.write().await = outcomes;

        let count = self.len().await;
        info!("Loaded plugins: {:?}", self.list_registered().await);
        count
    }

    async fn load_candidate(&self, path: &Path) -> PluginOutcome {
        let manifest = match PluginManifest::load(path).await {
            Ok(manifest) => manifest,
            Err(e) => {
                return PluginOutcome {
                    path: path.to_path_buf(),
                    name: None,
                    state: PluginState::Failed(e),
                }
            }
        };

        let name = manifest.name.clone();
        let state = match self.instantiate(manifest).await {
            Ok(plugin) => {
                self.insert(plugin).await;
                PluginState::Registered
            }
            Err(e) => PluginState::Failed(e),
        };

        PluginOutcome {
            path: path.to_path_buf(),
            name: Some(name),
            state,
        }
    }

    async fn instantiate(&self, manifest: PluginManifest) -> PluginResult<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(&manifest.kind)
            .ok_or_else(|| PluginError::NoPluginFound {
                path: manifest.path.clone(),
            })?;

        let factory = Arc::clone(factory);
        let name = manifest.name.clone();
        let ctx = PluginContext::new(&name, Arc::clone(&self.store)).with_defaults(manifest.config);
        debug!(plugin = %name, state = %PluginState::Initializing, "plugin lifecycle");

        // Construction and initialize share one task; a panic in either only fails this plugin
        let handle = tokio::spawn(async move {
            let mut plugin = (factory.as_ref())(ctx);
            let result = plugin.initialize().await;
            (plugin, result)
        });
        let _guard = AbortOnDrop(handle.abort_handle());

        match handle.await {
            Ok((plugin, Ok(true))) => Ok(Arc::from(plugin)),
            Ok((_, Ok(false))) => Err(PluginError::init(name, "initialize returned false")),
            Ok((_, Err(e))) => Err(PluginError::init(name, e)),
            Err(e) => Err(PluginError::init(name, e)),
        }
    }

    /// 이름 충돌 시 나중에 발견된 플러그인이 이전 것을 대체
    async fn insert(&self, plugin: Arc<dyn Plugin>) {
        let name = plugin.name().to_string();

        let mut counter = self.load_counter.write().await;
        *counter += 1;
        let load_order = *counter;

        let mut plugins = self.plugins.write().await;
        if plugins.contains_key(&name) {
            warn!("Plugin name collision: '{}' replaces an earlier plugin", name);
        }
        plugins.insert(name.clone(), PluginInfo { plugin, load_order });
        info!("Successfully loaded plugin: {}", name);
    }

    // ========================================================================
    // Runtime
    // ========================================================================

    /// 등록된 이름 (발견 순서)
    pub async fn list_registered(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let mut entries: Vec<_> = plugins.iter().collect();
        entries.sort_by_key(|(_, info)| info.load_order);
        entries.into_iter().map(|(name, _)| name.clone()).collect()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let plugins = self.plugins.read().await;
        plugins.get(name).map(|info| Arc::clone(&info.plugin))
    }

    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }

    /// 플러그인 실행
    ///
    /// The plugin's own output is returned as-is; only dispatch problems
    /// become errors.
    pub async fn execute(&self, name: &str, args: &[String]) -> PluginResult<PluginOutput> {
        let plugin = self
            .get(name)
            .await
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;

        let args = args.to_vec();
        let handle = tokio::spawn(async move { plugin.execute(&args).await });
        let _guard = AbortOnDrop(handle.abort_handle());

        handle.await.map_err(|e| PluginError::Execute {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// 플러그인 유효 설정
    pub async fn describe_config(&self, name: &str) -> PluginResult<Section> {
        self.get(name)
            .await
            .map(|plugin| plugin.describe_config())
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// 마지막 discover_all 결과
    pub async fn outcomes(&self) -> Vec<PluginOutcome> {
        self.outcomes.read().await.clone()
    }
}
