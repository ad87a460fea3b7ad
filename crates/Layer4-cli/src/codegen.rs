//! Project code generation - 파싱된 ProjectSpec을 디스크에 기록

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thot_foundation::{Error, Result, WorkerPool};
use thot_provider::{ProjectEntry, ProjectSpec};
use tracing::{debug, info};

/// 생성 디렉토리 접두사
pub const OUTPUT_PREFIX: &str = "generated_project_";

/// `<base>/generated_project_<YYYYmmdd_HHMMSS>`
pub fn output_dir(base: &Path, now: DateTime<Local>) -> PathBuf {
    base.join(format!("{}{}", OUTPUT_PREFIX, now.format("%Y%m%d_%H%M%S")))
}

/// 기록 결과
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub folders: usize,
    pub files: Vec<PathBuf>,
}

/// Write every entry of `spec` under `root` on the worker pool
///
/// Paths in a [`ProjectSpec`] are already relative and free of `..`.
pub async fn write_project(
    workers: &WorkerPool,
    spec: &ProjectSpec,
    root: PathBuf,
) -> Result<WriteSummary> {
    if spec.is_empty() {
        return Err(Error::Validation(
            "Provider response contained no FOLDER:/FILE: entries".to_string(),
        ));
    }

    let entries = spec.entries.clone();
    workers.try_run(move || write_entries(&root, &entries)).await
}

fn write_entries(root: &Path, entries: &[ProjectEntry]) -> Result<WriteSummary> {
    std::fs::create_dir_all(root)?;
    let mut summary = WriteSummary::default();

    for entry in entries {
        match entry {
            ProjectEntry::Folder(path) => {
                std::fs::create_dir_all(root.join(path))?;
                summary.folders += 1;
            }
            ProjectEntry::File { path, content } => {
                let target = root.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, content).map_err(|e| {
                    Error::Storage(format!("Failed to write {}: {}", target.display(), e))
                })?;
                debug!("Wrote {}", target.display());
                summary.files.push(path.clone());
            }
        }
    }

    info!(
        root = %root.display(),
        folders = summary.folders,
        files = summary.files.len(),
        "Project written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_dir_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let dir = output_dir(Path::new("/tmp"), now);
        assert_eq!(dir, PathBuf::from("/tmp/generated_project_20240305_070809"));
    }

    #[tokio::test]
    async fn test_write_project() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let spec = ProjectSpec::parse(
            "FOLDER: app/\nFILE: app/main.py\nprint('hi')\nFILE: README.md\n# Demo\n",
        );

        let summary = write_project(&WorkerPool::new(1), &spec, root.clone())
            .await
            .unwrap();

        assert_eq!(summary.folders, 1);
        assert_eq!(
            summary.files,
            vec![PathBuf::from("app/main.py"), PathBuf::from("README.md")]
        );
        assert_eq!(
            std::fs::read_to_string(root.join("app/main.py")).unwrap(),
            "print('hi')\n"
        );
        assert!(root.join("README.md").exists());
    }

    #[tokio::test]
    async fn test_empty_spec_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("out");
        let spec = ProjectSpec::parse("Sorry, I cannot help with that.");

        let err = write_project(&WorkerPool::default(), &spec, root.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!root.exists());
    }
}
