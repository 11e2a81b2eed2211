//! FTP-backed remote session.

use std::io::{self, Write};

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info};

use super::{bare_name, copy_stream, RemoteError, RemoteSession, TransferError};
use crate::config::FtpConfig;

/// A logged-in FTP session in binary transfer mode.
pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    /// Connect, log in, and switch to binary mode.
    pub fn connect(config: &FtpConfig) -> Result<Self, RemoteError> {
        let address = config.address();
        debug!(address = %address, "Connecting to FTP server");

        let mut stream = FtpStream::connect(&address)?;
        stream.login(config.username.as_str(), config.password.as_str())?;
        stream.transfer_type(FileType::Binary)?;

        info!(host = %config.host, user = %config.username, "FTP session established");
        Ok(Self { stream })
    }

    /// Close the session politely.
    pub fn quit(mut self) -> Result<(), RemoteError> {
        self.stream.quit()?;
        Ok(())
    }
}

impl RemoteSession for FtpSession {
    fn change_dir(&mut self, directory: &str) -> Result<(), RemoteError> {
        self.stream.cwd(directory)?;
        Ok(())
    }

    fn list_names(&mut self) -> Result<Vec<String>, RemoteError> {
        let names = self.stream.nlst(None)?;
        Ok(names
            .iter()
            .map(|name| bare_name(name.trim()).to_string())
            .filter(|name| !name.is_empty())
            .collect())
    }

    fn retrieve(&mut self, filename: &str, sink: &mut dyn Write) -> Result<u64, TransferError> {
        // The FTP client only carries its own error type out of the data
        // callback, so the local write error is parked here.
        let mut write_error: Option<io::Error> = None;

        let result = self.stream.retr(filename, |reader| {
            match copy_stream(reader, sink) {
                Ok(bytes) => Ok(bytes),
                Err(TransferError::Write(e)) => {
                    let message = e.to_string();
                    write_error = Some(e);
                    Err(FtpError::ConnectionError(io::Error::new(
                        io::ErrorKind::Other,
                        message,
                    )))
                }
                Err(TransferError::Remote(RemoteError::Io(e))) => {
                    Err(FtpError::ConnectionError(e))
                }
                Err(TransferError::Remote(other)) => Err(FtpError::ConnectionError(
                    io::Error::new(io::ErrorKind::Other, other.to_string()),
                )),
            }
        });

        match (result, write_error) {
            (_, Some(e)) => Err(TransferError::Write(e)),
            (Ok(bytes), None) => Ok(bytes),
            (Err(e), None) => Err(TransferError::Remote(e.into())),
        }
    }
}

impl From<FtpError> for RemoteError {
    fn from(e: FtpError) -> Self {
        match e {
            FtpError::ConnectionError(io) => RemoteError::Io(io),
            other => RemoteError::Protocol(other.to_string()),
        }
    }
}
