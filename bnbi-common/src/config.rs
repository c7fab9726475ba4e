//! Configuration file resolution and TOML loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "BNBI_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration file resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `<config dir>/bnbi/<file_name>` if it exists
///
/// Returns `None` when no file is found; callers fall back to compiled defaults.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str, file_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = default_config_dir()?.join(file_name);
    user_config.exists().then_some(user_config)
}

/// Platform configuration directory for bnbi (`~/.config/bnbi` on Linux)
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bnbi"))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Defaults => f.write_str("compiled defaults"),
        }
    }
}

/// Load a TOML configuration, or defaults when no path was resolved
///
/// Runs before logging is set up, so it does not log; report the returned
/// origin once the subscriber is installed.
///
/// A resolved path that cannot be read or parsed is an error.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<(T, ConfigOrigin)>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok((T::default(), ConfigOrigin::Defaults));
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok((config, ConfigOrigin::File(path.to_path_buf())))
}
