//! Logging setup.
//!
//! Console output goes to stderr. An optional log file receives the same
//! events without ANSI colours; the file is never rotated by this process
//! (the host's log rotation owns it). `RUST_LOG` overrides the default
//! filter.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "marcsync=info,marcsync_cli=info";

/// Filter used with `--verbose` when `RUST_LOG` is not set.
pub const VERBOSE_FILTER: &str = "marcsync=debug,marcsync_cli=debug";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file path has no file name.
    #[error("invalid log file path: {0}")]
    InvalidPath(PathBuf),

    /// The log file's directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber.
///
/// # Returns
///
/// The file writer's guard when `log_file` is given. Buffered lines are
/// flushed when it is dropped, so the caller keeps it alive until exit.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            std::fs::create_dir_all(&directory).map_err(|source| LoggingError::CreateDir {
                path: directory.clone(),
                source,
            })?;

            let appender = tracing_appender::rolling::never(&directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(guard)
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    })
}

/// Splits a log file path into its directory (`.` for bare names) and file
/// name.
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((directory, PathBuf::from(file_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/marcsync/run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/marcsync"));
        assert_eq!(name, PathBuf::from("run.log"));
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, PathBuf::from("run.log"));
    }

    #[test]
    fn test_split_rejects_directory_only() {
        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }
}
