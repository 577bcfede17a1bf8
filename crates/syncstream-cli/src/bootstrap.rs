//! Settings resolution for the binary.
//!
//! Precedence, lowest first: built-in defaults, the `--config` JSON file,
//! `SYNCSTREAM_*` environment variables (including those from `.env`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use syncstream_core::{SettingsUpdate, SyncSettings, validate_settings};

/// Inputs to settings resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config_path: Option<PathBuf>,
}

/// Resolve settings from the process environment.
pub fn load_settings(config: &CliConfig) -> Result<SyncSettings> {
    resolve_settings(config.config_path.as_deref(), std::env::vars())
}

/// Resolve settings from an explicit set of variables.
pub fn resolve_settings<I>(config_path: Option<&Path>, vars: I) -> Result<SyncSettings>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut settings = match config_path {
        Some(path) => SyncSettings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => SyncSettings::with_defaults(),
    };

    let update = SettingsUpdate::from_env_vars(vars).context("Invalid environment override")?;
    settings.merge(&update);
    validate_settings(&settings).context("Invalid settings")?;

    tracing::debug!(?settings, "Resolved settings");
    Ok(settings)
}
