//! CLI subcommands.

pub mod cleanup;
pub mod run;
pub mod status;

use std::path::{Path, PathBuf};

use marcsync::config::{default_config_path, SyncConfig};
use tracing::debug;

use crate::error::CliError;

/// Loads the configuration from `explicit` or the default location.
pub fn load_config(explicit: Option<&Path>) -> Result<SyncConfig, CliError> {
    let path = resolve_config_path(explicit)?;
    debug!(path = %path.display(), "Loading configuration");
    Ok(SyncConfig::load(&path)?)
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or(CliError::NoConfigPath),
    }
}
