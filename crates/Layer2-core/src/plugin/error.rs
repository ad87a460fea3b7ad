//! Plugin lifecycle and dispatch errors

use std::path::PathBuf;
use thiserror::Error;

/// 플러그인 에러
///
/// Lifecycle variants (`Load`, `NoPluginFound`, `Init`) never leave
/// [`PluginRegistry::discover_all`](super::PluginRegistry::discover_all);
/// they are recorded as outcomes instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    /// Candidate file could not be read or parsed
    #[error("Failed to load plugin {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },

    /// Candidate names no registered plugin kind
    #[error("No plugin found in {}", .path.display())]
    NoPluginFound { path: PathBuf },

    /// `initialize` returned false, failed, or panicked
    #[error("Plugin {name} failed to initialize: {message}")]
    Init { name: String, message: String },

    /// Dispatch to a name that is not registered
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// `execute` panicked
    #[error("Plugin {name} crashed: {message}")]
    Execute { name: String, message: String },
}

impl PluginError {
    pub fn load(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        PluginError::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn init(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        PluginError::Init {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

pub type PluginResult<T> = std::result::Result<T, PluginError>;
