//! Configuration resolution for wxr-import
//!
//! Every setting resolves with CLI → ENV → TOML → compiled default priority.

use std::path::PathBuf;
use tracing::info;
use wxr_common::config::{
    resolve_path, resolve_string, CompiledDefaults, ImportSettings, TomlConfig, ENV_DATABASE,
    ENV_UPLOADS_DIR, ENV_UPLOADS_URL,
};

/// Settings given on the command line (unset flags are `None`)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub uploads_url: Option<String>,
    pub fetch_attachments: Option<bool>,
    pub allow_create_users: Option<bool>,
    pub max_attachment_size: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub uploads_url: String,
    pub import: ImportSettings,
    pub log_level: String,
}

pub fn resolve_config(cli: &CliOverrides, toml_config: &TomlConfig) -> ResolvedConfig {
    let defaults = CompiledDefaults::for_current_platform();

    let database_path = resolve_path(
        cli.database.as_deref(),
        ENV_DATABASE,
        toml_config.database_path.as_deref(),
        &defaults.database_path,
    );
    let uploads_dir = resolve_path(
        cli.uploads_dir.as_deref(),
        ENV_UPLOADS_DIR,
        toml_config.uploads_dir.as_deref(),
        &defaults.uploads_dir,
    );
    let uploads_url = resolve_string(
        cli.uploads_url.as_deref(),
        ENV_UPLOADS_URL,
        toml_config.uploads_url.as_deref(),
        &defaults.uploads_url,
    );

    // TOML (or default) first, then ENV, then CLI on top
    let mut import = toml_config.import.clone();
    import.apply_env_overrides();
    if let Some(value) = cli.fetch_attachments {
        import.fetch_attachments = value;
    }
    if let Some(value) = cli.allow_create_users {
        import.allow_create_users = value;
    }
    if let Some(value) = cli.max_attachment_size {
        import.max_attachment_size = value;
    }
    if let Some(value) = cli.request_timeout_secs {
        import.request_timeout_secs = value;
    }

    info!(
        database = %database_path.display(),
        uploads = %uploads_dir.display(),
        fetch_attachments = import.fetch_attachments,
        allow_create_users = import.allow_create_users,
        "Configuration resolved"
    );

    ResolvedConfig {
        database_path,
        uploads_dir,
        uploads_url,
        import,
        log_level: toml_config.logging.level.clone(),
    }
}
