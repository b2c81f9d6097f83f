//! Configuration loading and root folder resolution
//!
//! A missing config file is not an error: the service starts with defaults.
//! A config file that exists but does not parse is.

use crate::progression::EvaluationSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MTQ_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "mtq.db";

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Evaluation section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub practice_sentences: u32,
    pub feedback_required: bool,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    pub logging: LoggingConfig,
    pub evaluation: EvaluationConfig,
    /// Hex SHA-256 of the admin key; admin routes are open when unset
    pub admin_key_sha256: Option<String>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
            logging: LoggingConfig::default(),
            evaluation: EvaluationConfig::default(),
            admin_key_sha256: None,
        }
    }
}

impl TomlConfig {
    pub fn evaluation_settings(&self) -> EvaluationSettings {
        EvaluationSettings {
            practice_sentences: self.evaluation.practice_sentences,
            feedback_required: self.evaluation.feedback_required,
        }
    }
}

/// Load a TOML config file, falling back to defaults if it does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok(config)
}

/// Default config file location: `<config dir>/mtq/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("mtq").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("./mtq_config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mtq"))
        .unwrap_or_else(|| PathBuf::from("./mtq_data"))
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}
