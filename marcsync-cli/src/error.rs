//! CLI error type.

use thiserror::Error;

use marcsync::config::ConfigError;
use marcsync::logging::LoggingError;
use marcsync::notify::NotifyError;
use marcsync::SyncError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No `--config` and no platform config directory.
    #[error("no configuration file given and no default location available; use --config")]
    NoConfigPath,

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The run notification could not be delivered.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}
