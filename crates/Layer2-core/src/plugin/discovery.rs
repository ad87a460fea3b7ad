//! Plugin Discovery - 플러그인 디렉토리 스캔
//!
//! Candidates are `*.json` files directly inside the plugin directory.
//! Names starting with `_` or `.` are ignored. A missing directory is
//! created and yields no candidates.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 매니페스트 확장자
pub const MANIFEST_EXTENSION: &str = "json";

/// 후보 파일 목록 (파일명 순)
pub async fn scan_plugin_directory(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        info!("Plugin directory {} not found, creating it", dir.display());
        fs::create_dir_all(dir).await?;
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if is_candidate(&path) {
            candidates.push(path);
        } else {
            debug!("Ignoring {:?} in plugin directory", path);
        }
    }

    candidates.sort();
    Ok(candidates)
}

/// 명명 규칙 검사
pub fn is_candidate(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with('_') || file_name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}
