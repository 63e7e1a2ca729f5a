pub mod chat;
pub mod doctor;
pub mod init;
pub mod status;
pub mod tools;

use std::path::{Path, PathBuf};

use delver_config::AppConfig;

/// The config file in effect: `--config` if given, else the default path.
pub fn resolve_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path)
}

/// Load config with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = resolve_path(path);
    AppConfig::load_with_env(&path)
        .map_err(|e| format!("Failed to load config from {}: {e}", path.display()).into())
}
