//! Byte-for-byte retrieval of remote files into the download directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteSession, TransferError, BUFFER_SIZE};

/// Materializes remote files in a local download directory.
///
/// Files are written unchanged under their remote name. A failed transfer is
/// fatal for the run and is not retried.
#[derive(Debug, Clone)]
pub struct Downloader {
    download_dir: PathBuf,
}

impl Downloader {
    /// Creates a downloader writing into `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    /// The directory downloads land in.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Retrieves `remote_name` from the session's current directory.
    ///
    /// # Returns
    ///
    /// The local path of the downloaded file.
    ///
    /// # Errors
    ///
    /// - [`SyncError::LocalIo`] if the local file cannot be created, written
    ///   or flushed
    /// - [`SyncError::Transfer`] if the remote side fails
    pub fn fetch<S: RemoteSession + ?Sized>(
        &self,
        session: &mut S,
        remote_name: &str,
    ) -> SyncResult<PathBuf> {
        fs::create_dir_all(&self.download_dir)
            .map_err(|e| SyncError::local_io(&self.download_dir, e))?;

        let dest = self.download_dir.join(remote_name);
        debug!(file = remote_name, dest = %dest.display(), "Starting download");

        let file = File::create(&dest).map_err(|e| SyncError::local_io(&dest, e))?;
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

        let bytes = session
            .retrieve(remote_name, &mut writer)
            .map_err(|e| match e {
                TransferError::Write(source) => SyncError::local_io(&dest, source),
                TransferError::Remote(source) => SyncError::Transfer {
                    filename: remote_name.to_string(),
                    source,
                },
            })?;

        writer.flush().map_err(|e| SyncError::local_io(&dest, e))?;

        info!(file = remote_name, bytes, "Downloaded");
        Ok(dest)
    }

    /// Retrieves every name in `remote_names`, in order.
    ///
    /// Stops at the first failure; files fetched before it stay on disk.
    pub fn fetch_all<S: RemoteSession + ?Sized>(
        &self,
        session: &mut S,
        remote_names: &[String],
    ) -> SyncResult<Vec<PathBuf>> {
        remote_names
            .iter()
            .map(|name| self.fetch(session, name))
            .collect()
    }
}
