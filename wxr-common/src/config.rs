//! Configuration loading and resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup; defaults are used
//! and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "wxr-import";

/// Environment variable names
pub const ENV_FETCH_ATTACHMENTS: &str = "WXR_FETCH_ATTACHMENTS";
pub const ENV_ALLOW_CREATE_USERS: &str = "WXR_ALLOW_CREATE_USERS";
pub const ENV_MAX_ATTACHMENT_SIZE: &str = "WXR_MAX_ATTACHMENT_SIZE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "WXR_REQUEST_TIMEOUT_SECS";
pub const ENV_DATABASE: &str = "WXR_DATABASE";
pub const ENV_UPLOADS_DIR: &str = "WXR_UPLOADS_DIR";
pub const ENV_UPLOADS_URL: &str = "WXR_UPLOADS_URL";

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Import policy toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Download and import attachment binaries
    pub fetch_attachments: bool,
    /// Create local accounts for unmapped export authors
    pub allow_create_users: bool,
    /// Maximum attachment size in bytes (0 = unlimited)
    pub max_attachment_size: u64,
    /// Upper bound for a single attachment request
    pub request_timeout_secs: u64,
    /// Defer term/comment count recalculation until the end of the run
    pub defer_counting: bool,
    /// User-Agent sent when fetching attachments
    pub user_agent: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            fetch_attachments: false,
            allow_create_users: true,
            max_attachment_size: 0,
            request_timeout_secs: 60,
            defer_counting: true,
            user_agent: format!("{}/{}", APP_DIR_NAME, env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ImportSettings {
    /// Apply `WXR_*` environment variable overrides on top of file/default values
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_bool(ENV_FETCH_ATTACHMENTS) {
            self.fetch_attachments = value;
        }
        if let Some(value) = env_bool(ENV_ALLOW_CREATE_USERS) {
            self.allow_create_users = value;
        }
        if let Some(value) = env_u64(ENV_MAX_ATTACHMENT_SIZE) {
            self.max_attachment_size = value;
        }
        if let Some(value) = env_u64(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = value;
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub import: ImportSettings,
    /// SQLite database holding the target content store
    pub database_path: Option<PathBuf>,
    /// Directory that receives fetched attachment files
    pub uploads_dir: Option<PathBuf>,
    /// Public URL prefix matching `uploads_dir`
    pub uploads_url: Option<String>,
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub uploads_url: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./wxr_data"));

        Self {
            database_path: data_dir.join("content.db"),
            uploads_dir: data_dir.join("uploads"),
            uploads_url: "http://localhost/uploads".to_string(),
            data_dir,
        }
    }
}

/// Default location of the config file (`<config_dir>/wxr-import/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Load the TOML config from `path`, or from the default location when `None`
///
/// A missing file yields defaults. A file that exists but does not parse is an
/// error only when the path was given explicitly.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let explicit = path.is_some();
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        info!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Err(e) if explicit => Err(Error::Config(format!("Parse TOML failed: {}", e))),
        Err(e) => {
            warn!(
                "Ignoring malformed config file {}: {}",
                path.display(),
                e
            );
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file, creating the parent directory if needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve a path setting: CLI → ENV → TOML → default
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }
    default.to_path_buf()
}

/// Resolve a string setting: CLI → ENV → TOML → default
pub fn resolve_string(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
    default: &str,
) -> String {
    if let Some(value) = cli_arg {
        return value.to_string();
    }
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    toml_value.unwrap_or(default).to_string()
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!("Ignoring {}={:?}: expected a boolean", name, other);
            None
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: expected an unsigned integer", name, raw);
            None
        }
    }
}
