//! Project spec parsing
//!
//! `generate_project_spec` 응답 형식:
//!
//! ```text
//! FOLDER: src/
//! FILE: src/main.py
//! print("hello")
//! ```
//!
//! A `FILE:` marker owns every following line until the next marker or end
//! of input. Text before the first marker is ignored.

use std::path::{Component, Path, PathBuf};
use tracing::warn;

const FOLDER_MARKER: &str = "FOLDER:";
const FILE_MARKER: &str = "FILE:";

/// One entry of a generated project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEntry {
    Folder(PathBuf),
    File { path: PathBuf, content: String },
}

/// Parsed project description (relative paths only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSpec {
    pub entries: Vec<ProjectEntry>,
}

enum Marker<'a> {
    Folder(&'a str),
    File(&'a str),
}

impl ProjectSpec {
    pub fn parse(text: &str) -> Self {
        let mut spec = ProjectSpec::default();
        let mut current: Option<(PathBuf, Vec<&str>)> = None;
        // Inside a code fence of a file body every line is content
        let mut in_fence = false;

        for line in text.lines() {
            let is_fence = line.trim_start().starts_with("```");
            if in_fence {
                if let Some((_, body)) = current.as_mut() {
                    body.push(line);
                }
                in_fence = !is_fence;
                continue;
            }

            let Some(marker) = parse_marker(line) else {
                if let Some((_, body)) = current.as_mut() {
                    body.push(line);
                    in_fence = is_fence;
                }
                continue;
            };

            if let Some((path, body)) = current.take() {
                spec.push_file(path, &body);
            }

            match marker {
                Marker::Folder(raw) => {
                    if let Some(path) = checked_path(raw) {
                        spec.entries.push(ProjectEntry::Folder(path));
                    }
                }
                Marker::File(raw) => {
                    current = checked_path(raw).map(|path| (path, Vec::new()));
                }
            }
        }

        if let Some((path, body)) = current.take() {
            spec.push_file(path, &body);
        }
        spec
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn folders(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|e| match e {
            ProjectEntry::Folder(path) => Some(path.as_path()),
            ProjectEntry::File { .. } => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.entries.iter().filter_map(|e| match e {
            ProjectEntry::File { path, content } => Some((path.as_path(), content.as_str())),
            ProjectEntry::Folder(_) => None,
        })
    }

    fn push_file(&mut self, path: PathBuf, body: &[&str]) {
        self.entries.push(ProjectEntry::File {
            path,
            content: file_content(body),
        });
    }
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    // Tolerate markdown decoration such as `**FILE: x**` or `### FOLDER: y`
    let trimmed = line.trim().trim_start_matches(['#', '*', ' ']);
    if let Some(rest) = trimmed.strip_prefix(FOLDER_MARKER) {
        return Some(Marker::Folder(rest));
    }
    trimmed.strip_prefix(FILE_MARKER).map(Marker::File)
}

/// 상대 경로만 허용 (절대 경로 / `..` 거부)
fn checked_path(raw: &str) -> Option<PathBuf> {
    let cleaned = raw.trim().trim_matches(['`', '*', '"', '\'']).trim();
    let cleaned = cleaned.trim_end_matches(['/', '\\']);
    if cleaned.is_empty() {
        warn!("Skipping project entry with empty path");
        return None;
    }

    let path = Path::new(cleaned);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe || cleaned.starts_with(['/', '\\']) {
        warn!("Skipping project entry with unsafe path: {}", cleaned);
        return None;
    }

    Some(path.to_path_buf())
}

/// Drop a wrapping code fence and trailing blank lines
fn file_content(body: &[&str]) -> String {
    let mut lines: &[&str] = body;

    while let [first, rest @ ..] = lines {
        if first.trim().is_empty() {
            lines = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = lines {
        if last.trim().is_empty() {
            lines = rest;
        } else {
            break;
        }
    }

    if let [first, inner @ .., last] = lines {
        if first.trim_start().starts_with("```") && last.trim() == "```" {
            lines = inner;
        }
    }

    if lines.is_empty() {
        return String::new();
    }
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_folders_and_files() {
        let text = "\
Here is your project:

FOLDER: src/
FOLDER: tests/
FILE: requirements.txt
flask==2.0.1
pytest==6.2.5

FILE: src/main.py
from flask import Flask


app = Flask(__name__)

";
        let spec = ProjectSpec::parse(text);

        let folders: Vec<_> = spec.folders().collect();
        assert_eq!(folders, vec![Path::new("src"), Path::new("tests")]);

        let files: Vec<_> = spec.files().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], (Path::new("requirements.txt"), "flask==2.0.1\npytest==6.2.5\n"));
        assert_eq!(
            files[1].1,
            "from flask import Flask\n\n\napp = Flask(__name__)\n"
        );
    }

    #[test]
    fn test_code_fences_are_stripped() {
        let text = "FILE: `main.rs`\n```rust\nfn main() {}\n```\n";
        let spec = ProjectSpec::parse(text);
        let files: Vec<_> = spec.files().collect();
        assert_eq!(files, vec![(Path::new("main.rs"), "fn main() {}\n")]);
    }

    #[test]
    fn test_marker_like_comment_inside_fence_is_content() {
        let text = "\
FILE: src/main.py
```python
# FILE: src/main.py
print('hi')
```
FILE: run.sh
```sh
#!/bin/sh
# FILE: run.sh
```
";
        let spec = ProjectSpec::parse(text);
        let files: Vec<_> = spec.files().collect();
        assert_eq!(
            files,
            vec![
                (Path::new("src/main.py"), "# FILE: src/main.py\nprint('hi')\n"),
                (Path::new("run.sh"), "#!/bin/sh\n# FILE: run.sh\n"),
            ]
        );
    }

    #[test]
    fn test_unsafe_paths_are_skipped() {
        let text = "\
FILE: /etc/passwd
root
FILE: ../escape.txt
nope
FOLDER: a/../../b
FILE: ok.txt
fine
";
        let spec = ProjectSpec::parse(text);
        assert_eq!(spec.entries.len(), 1);
        assert_eq!(spec.files().next().unwrap().1, "fine\n");
    }

    #[test]
    fn test_no_markers_is_empty() {
        assert!(ProjectSpec::parse("Sorry, I cannot help with that.").is_empty());
    }

    #[test]
    fn test_empty_file_body() {
        let spec = ProjectSpec::parse("FILE: src/__init__.py\nFILE: b.txt\nx");
        let files: Vec<_> = spec.files().collect();
        assert_eq!(files[0], (Path::new("src/__init__.py"), ""));
        assert_eq!(files[1], (Path::new("b.txt"), "x\n"));
    }
}
