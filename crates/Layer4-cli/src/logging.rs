//! Logging setup
//!
//! Filter precedence: `RUST_LOG`, then `--debug`, then `DEFAULT.log_level`.
//! When `DEFAULT.log_file` is set, log lines go to that file so they do not
//! interleave with the conversation on the terminal.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use thot_foundation::{ConfigStore, DEFAULT_SECTION};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `log_level` 설정값을 tracing 필터 지시어로 변환
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" | "NONE" => "off",
        _ => "info",
    }
}

pub fn init(store: &ConfigStore, debug: bool) -> anyhow::Result<()> {
    let level = if debug {
        "debug"
    } else {
        level_directive(&store.get_or(DEFAULT_SECTION, "log_level", "INFO"))
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = store
        .get(DEFAULT_SECTION, "log_file")
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let (file_layer, stderr_layer) = match log_file {
        Some(path) => {
            let file = open_log_file(Path::new(&path))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("warning"), "warn");
        assert_eq!(level_directive(" CRITICAL "), "error");
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("bogus"), "info");
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
