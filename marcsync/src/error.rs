//! Error types for synchronization runs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::category::CategoryKind;
use crate::config::ConfigError;
use crate::date::DumpDate;
use crate::remote::RemoteError;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Fatal errors. Any of these aborts the current run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote session could not be established.
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: RemoteError,
    },

    /// The configured remote directory is not reachable.
    #[error("can't change directory to \"{directory}\": {source}")]
    RemoteDirectory {
        directory: String,
        #[source]
        source: RemoteError,
    },

    /// Listing kept failing after every retry.
    #[error("listing \"{directory}\" failed after {attempts} attempt(s): {source}")]
    Listing {
        directory: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// A remote batch is incomplete or inconsistent.
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    /// Local open, write, copy or delete failed.
    #[error("local I/O on {path} failed: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Retrieving a remote file failed.
    #[error("download of \"{filename}\" failed: {source}")]
    Transfer {
        filename: String,
        #[source]
        source: RemoteError,
    },

    /// A file believed to be dated carries no date.
    #[error("\"{filename}\" does not contain a date")]
    NoDateFound { filename: String },
}

impl SyncError {
    /// Wrap an I/O error with the path it concerns.
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}

/// Reasons a remote batch is refused before anything is downloaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// A paired category published an odd number of files; the producer is
    /// most likely still generating the batch.
    #[error("{kind}: found {count} file(s) for a paired category, generation apparently not complete")]
    IncompletePair { kind: CategoryKind, count: usize },

    /// A paired full-dump batch spans more than one date.
    #[error("full dump batch has differing dates: {first} and {other}")]
    MixedDates { first: DumpDate, other: DumpDate },

    /// More than one unpaired full dump is waiting on the remote side.
    #[error("found {count} full dumps where at most one was expected: {files:?}")]
    MultipleFullDumps { count: usize, files: Vec<String> },
}
