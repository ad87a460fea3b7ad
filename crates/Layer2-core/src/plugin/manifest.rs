//! Plugin Manifest - 플러그인 디렉토리의 `*.json` 파일
//!
//! ```json
//! { "plugin": "calculator", "name": "Calculator", "config": { "precision": 3 } }
//! ```
//!
//! `plugin` selects a registered factory; `name` defaults to the file stem;
//! `config` holds defaults that the `Plugin.<name>` store section overrides.

use super::error::{PluginError, PluginResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thot_foundation::Section;
use tokio::fs;

/// 파싱된 매니페스트
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    /// Factory kind
    pub kind: String,
    /// Registry name
    pub name: String,
    pub description: Option<String>,
    /// Default configuration values (stringified)
    pub config: Section,
    /// Source file
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    plugin: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    config: BTreeMap<String, Value>,
}

impl PluginManifest {
    /// 파일에서 매니페스트 로드
    pub async fn load(path: &Path) -> PluginResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PluginError::load(path, e))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> PluginResult<Self> {
        let file: ManifestFile =
            serde_json::from_str(content).map_err(|e| PluginError::load(path, e))?;

        let kind = file
            .plugin
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PluginError::NoPluginFound {
                path: path.to_path_buf(),
            })?;

        let name = file
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| kind.clone());

        let config = file
            .config
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();

        Ok(Self {
            kind,
            name,
            description: file.description,
            config,
            path: path.to_path_buf(),
        })
    }
}
