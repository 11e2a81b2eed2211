//! Remote endpoint access.
//!
//! The engine needs three things from the endpoint publishing the exports:
//! change into a directory, list the names in it, and retrieve one file as
//! raw bytes. [`RemoteSession`] captures exactly that. One session is opened
//! per run and reused for every category.
//!
//! Implementations:
//! - [`FtpSession`] talks to the producer's FTP server
//! - [`LocalDirSession`] serves a directory tree (a mounted mirror, tests)

mod ftp;
mod local;

pub use ftp::FtpSession;
pub use local::LocalDirSession;

use std::io::{self, Read, Write};

use thiserror::Error;

/// Buffer size for streaming transfers (64KB).
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Failures reported by the remote side.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server refused or failed a command.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection or the remote read failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested directory or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RemoteError::NotFound(_))
    }
}

/// Why a retrieval failed: on the remote side or while writing locally.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading from the remote side failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Writing to the local sink failed.
    #[error("local write failed: {0}")]
    Write(#[source] io::Error),
}

/// A session on the remote endpoint.
pub trait RemoteSession {
    /// Make `directory` the current directory.
    fn change_dir(&mut self, directory: &str) -> Result<(), RemoteError>;

    /// Names of the entries in the current directory.
    fn list_names(&mut self) -> Result<Vec<String>, RemoteError>;

    /// Stream `filename` from the current directory into `sink`, unchanged.
    ///
    /// Returns the number of bytes transferred.
    fn retrieve(&mut self, filename: &str, sink: &mut dyn Write) -> Result<u64, TransferError>;
}

/// Copy `reader` into `writer`, keeping read and write failures apart.
pub(crate) fn copy_stream(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
) -> Result<u64, TransferError> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut transferred = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Remote(RemoteError::Io(e))),
        };

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(TransferError::Write)?;

        transferred += bytes_read as u64;
    }

    Ok(transferred)
}

/// Strip any directory part some servers prepend to listed names.
pub(crate) fn bare_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_copy_stream_copies_bytes() {
        let data = vec![7u8; BUFFER_SIZE * 2 + 11];
        let mut output = Vec::new();
        let copied = copy_stream(&mut data.as_slice(), &mut output).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(output, data);
    }

    #[test]
    fn test_copy_stream_reports_write_failure() {
        let data = b"abc".to_vec();
        let result = copy_stream(&mut data.as_slice(), &mut FailingWriter);
        assert!(matches!(result, Err(TransferError::Write(_))));
    }

    #[test]
    fn test_not_found_is_not_transient() {
        assert!(!RemoteError::NotFound("/x".into()).is_transient());
        assert!(RemoteError::Protocol("421".into()).is_transient());
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(bare_name("/ixtheo/LOEPPN-200101"), "LOEPPN-200101");
        assert_eq!(bare_name("LOEPPN-200101"), "LOEPPN-200101");
    }
}
