//! Bootstrap configuration loading and layered setting resolution
//!
//! Every setting resolves in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: it is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default base URL of the album processing service API
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Default listen address of the orchestrator control API
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5730";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_USER_AGENT: &str = concat!("mtm/", env!("CARGO_PKG_VERSION"));

pub const ENV_SERVICE_URL: &str = "MTM_SERVICE_URL";
pub const ENV_BIND_ADDRESS: &str = "MTM_BIND_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "MTM_LOG_LEVEL";
pub const ENV_CONFIG_FILE: &str = "MTM_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// All fields are optional; anything left out falls through to the compiled
/// defaults during resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the album processing service, e.g. `http://host:8000/api/v1`
    #[serde(default)]
    pub service_url: Option<String>,

    /// Listen address for the control API
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Per-request timeout for remote calls
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// User-Agent sent to the processing service
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

impl TomlConfig {
    /// Parse a config file, failing on read or parse errors
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load from an explicit path, `MTM_CONFIG`, or the platform location,
    /// falling back to defaults with a warning
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG_FILE).ok().map(PathBuf::from))
            .or_else(default_config_file);

        let Some(path) = path else {
            warn!("No config file found, using built-in defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// Where a resolved setting came from, for startup logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    TomlFile,
    Default,
}

/// A setting value together with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSetting {
    pub value: String,
    pub source: SettingSource,
}

/// Resolve one string setting through the CLI → ENV → TOML → default chain
///
/// Blank values at any tier are treated as unset.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
    default: &str,
) -> ResolvedSetting {
    fn usable(value: &str) -> bool {
        !value.trim().is_empty()
    }

    if let Some(value) = cli_arg.filter(|v| usable(v)) {
        return ResolvedSetting {
            value: value.to_string(),
            source: SettingSource::CommandLine,
        };
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if usable(&value) {
            return ResolvedSetting {
                value,
                source: SettingSource::Environment,
            };
        }
    }

    if let Some(value) = toml_value.filter(|v| usable(v)) {
        return ResolvedSetting {
            value: value.to_string(),
            source: SettingSource::TomlFile,
        };
    }

    ResolvedSetting {
        value: default.to_string(),
        source: SettingSource::Default,
    }
}

/// Platform config file location, if one exists
fn default_config_file() -> Option<PathBuf> {
    // ~/.config/mtm/config.toml first
    let user_config = dirs::config_dir().map(|d| d.join("mtm").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mtm/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
