//! Subcommand implementations.

pub mod ask;
pub mod doctor;
pub mod ingest;
pub mod init;
pub mod serve;

use ragdesk_config::AppConfig;
use std::path::{Path, PathBuf};

/// The config file to use: `--config` if given, else the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file plus environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_path(explicit);
    AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Fail early with setup instructions when a hosted provider has no API key.
pub fn require_api_key(config: &AppConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() || !config.requires_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    RAGDESK_API_KEY=sk-...");
    eprintln!("    OPENAI_API_KEY=sk-...");
    eprintln!();
    eprintln!("  Or add api_key to your config file:");
    eprintln!("    {}", path.display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
