//! Directory-backed remote session.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{copy_stream, RemoteError, RemoteSession, TransferError};

/// Serves a local directory tree as if it were the remote endpoint.
///
/// Absolute remote directories (`/ixtheo`) resolve below `root`; relative
/// ones resolve against the current directory.
#[derive(Debug, Clone)]
pub struct LocalDirSession {
    root: PathBuf,
    current: PathBuf,
}

impl LocalDirSession {
    /// Create a session rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            current: root.clone(),
            root,
        }
    }

    /// The directory the session is currently in.
    pub fn current_dir(&self) -> &Path {
        &self.current
    }
}

impl RemoteSession for LocalDirSession {
    fn change_dir(&mut self, directory: &str) -> Result<(), RemoteError> {
        let target = match directory.strip_prefix('/') {
            Some(relative) => self.root.join(relative),
            None => self.current.join(directory),
        };

        if !target.is_dir() {
            return Err(RemoteError::NotFound(directory.to_string()));
        }

        self.current = target;
        Ok(())
    }

    fn list_names(&mut self) -> Result<Vec<String>, RemoteError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.current)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn retrieve(&mut self, filename: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        let path = self.current.join(filename);
        let mut file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RemoteError::NotFound(filename.to_string())
            } else {
                RemoteError::Io(e)
            }
        })?;
        copy_stream(&mut file, sink)
    }
}
