//! ConfigStore - 섹션 기반 설정 저장소
//!
//! Sections map string keys to string values and are persisted as one TOML
//! table per section. Every mutation rewrites the whole file through a
//! temporary file and a rename, so a write either lands completely or not
//! at all.

use crate::registry::ProviderKind;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.toml";

/// 전역 설정 섹션 이름
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Key/value pairs of one section
pub type Section = BTreeMap<String, String>;

type Sections = BTreeMap<String, Section>;

/// 프로세스 전역 설정 저장소
///
/// Owned by the application root and shared as `Arc<ConfigStore>`.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    sections: RwLock<Sections>,
}

impl ConfigStore {
    /// 파일에서 로드하거나, 없으면 기본값으로 생성
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let sections = parse_document(&content)?;
            debug!("Loaded {} config sections from {}", sections.len(), path.display());
            return Ok(Self {
                path: Some(path),
                sections: RwLock::new(sections),
            });
        }

        info!("Config file {} not found, creating defaults", path.display());
        let store = Self {
            path: Some(path),
            sections: RwLock::new(default_sections()),
        };
        store.save()?;
        Ok(store)
    }

    /// 글로벌 설정 (~/.config/thot/config.toml)
    pub fn global() -> Result<Self> {
        Self::open(Self::global_path()?)
    }

    /// 글로벌 설정 파일 경로
    pub fn global_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join("thot");
        Ok(dir.join(CONFIG_FILE))
    }

    /// 메모리 전용 저장소 (파일 없음, 기본 섹션 포함)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sections: RwLock::new(default_sections()),
        }
    }

    /// 빈 메모리 저장소
    pub fn empty() -> Self {
        Self {
            path: None,
            sections: RwLock::new(Sections::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // 읽기
    // ========================================================================

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections
            .read()
            .get(section)
            .and_then(|s| s.get(key))
            .cloned()
    }

    pub fn get_or(&self, section: &str, key: &str, fallback: &str) -> String {
        self.get(section, key)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.read().contains_key(section)
    }

    /// 섹션 전체 복사본
    pub fn section(&self, section: &str) -> Option<Section> {
        self.sections.read().get(section).cloned()
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.read().keys().cloned().collect()
    }

    // ========================================================================
    // 쓰기
    // ========================================================================

    /// 단일 값 설정 후 즉시 저장
    pub fn set(&self, section: &str, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_many(section, [(key.to_string(), value.into())])
    }

    /// 여러 값을 한 번에 설정하고 한 번만 저장
    ///
    /// The section is created when missing. The in-memory state only changes
    /// once the durable write has succeeded.
    pub fn set_many<I, K, V>(&self, section: &str, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if section.trim().is_empty() {
            return Err(Error::Validation("Section name cannot be empty".to_string()));
        }

        let mut guard = self.sections.write();
        let mut next = guard.clone();
        let entry = next.entry(section.to_string()).or_default();
        for (key, value) in pairs {
            entry.insert(key.into(), value.into());
        }

        self.write_document(&next)?;
        *guard = next;
        Ok(())
    }

    /// 섹션 제거 (없으면 false)
    pub fn remove_section(&self, section: &str) -> Result<bool> {
        let mut guard = self.sections.write();
        if !guard.contains_key(section) {
            return Ok(false);
        }

        let mut next = guard.clone();
        next.remove(section);
        self.write_document(&next)?;
        *guard = next;
        Ok(true)
    }

    /// 현재 상태 전체 저장
    pub fn save(&self) -> Result<()> {
        let guard = self.sections.read();
        self.write_document(&guard)
    }

    fn write_document(&self, sections: &Sections) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Error::Storage(format!("Failed to create {}: {}", dir.display(), e))
                })?;
            }
        }

        let content = toml::to_string(sections)?;
        let tmp_path = path.with_extension("toml.tmp");

        std::fs::write(&tmp_path, content).map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::Storage(format!(
                "Failed to replace {}: {}",
                path.display(),
                e
            )));
        }

        debug!(path = %path.display(), "Config written");
        Ok(())
    }
}

/// 기본 설정 섹션
fn default_sections() -> Sections {
    let mut sections = Sections::new();

    let mut defaults = Section::new();
    defaults.insert("log_level".into(), "INFO".into());
    defaults.insert("log_file".into(), "logs/app.log".into());
    defaults.insert("ai_provider".into(), ProviderKind::OpenAi.id().into());
    defaults.insert("plugin_dir".into(), "plugins".into());
    sections.insert(DEFAULT_SECTION.to_string(), defaults);

    for kind in ProviderKind::ALL {
        let mut section = Section::new();
        section.insert("api_key".into(), kind.placeholder_api_key());
        section.insert("default_model".into(), kind.default_model().into());
        sections.insert(kind.section().to_string(), section);
    }

    // search plugins
    let mut tavily = Section::new();
    tavily.insert("api_key".into(), "your_tavily_api_key".into());
    sections.insert("Tavily".to_string(), tavily);

    let mut arxiv = Section::new();
    arxiv.insert("results_per_page".into(), "10".into());
    sections.insert("ArXiv".to_string(), arxiv);

    sections
}

/// TOML 문서를 섹션으로 변환
///
/// Non-string scalars are kept in their textual form; top-level scalars are
/// folded into `DEFAULT`; nested tables inside a section are ignored.
fn parse_document(content: &str) -> Result<Sections> {
    let table: toml::Table = content.parse()?;
    let mut sections = Sections::new();

    for (name, value) in table {
        match value {
            toml::Value::Table(entries) => flatten_table(name, entries, &mut sections),
            other => match scalar_to_string(&other) {
                Some(text) => {
                    sections
                        .entry(DEFAULT_SECTION.to_string())
                        .or_default()
                        .insert(name, text);
                }
                None => warn!("Ignoring top-level config value {}", name),
            },
        }
    }

    Ok(sections)
}

/// 중첩 테이블을 점으로 이은 섹션 이름으로 펼침
///
/// `[Models.openai.gpt-4]` and `["Models.openai.gpt-4"]` name the same
/// section. A table holding only nested tables creates no section itself.
fn flatten_table(name: String, entries: toml::Table, sections: &mut Sections) {
    if entries.is_empty() || entries.values().any(|v| !v.is_table()) {
        sections.entry(name.clone()).or_default();
    }

    for (key, value) in entries {
        match value {
            toml::Value::Table(nested) => {
                flatten_table(format!("{}.{}", name, key), nested, sections);
            }
            other => match scalar_to_string(&other) {
                Some(text) => {
                    sections.entry(name.clone()).or_default().insert(key, text);
                }
                None => warn!("Ignoring non-scalar config value {}.{}", name, key),
            },
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}
