//! marcsync - incremental retrieval and retention of dated MARC exports
//!
//! This library decides which dated export files published on a remote
//! endpoint are new relative to a local cumulative store, refuses batches
//! the producer has not finished publishing, downloads the accepted files,
//! and prunes the store so that exactly the data needed to rebuild the
//! current state is kept.

pub mod category;
pub mod config;
pub mod date;
pub mod download;
pub mod error;
pub mod lister;
pub mod logging;
pub mod notify;
pub mod remote;
pub mod retry;
pub mod store;
pub mod sync;
pub mod validate;

pub use category::{Category, CategoryKind, FilenameMatcher};
pub use config::{ConfigError, FtpConfig, SyncConfig};
pub use date::DumpDate;
pub use error::{ConsistencyError, SyncError, SyncResult};
pub use notify::{LogNotifier, Notifier, Priority, RunContext};
pub use remote::{FtpSession, LocalDirSession, RemoteSession};
pub use store::{CleanupReport, CumulativeStore};
pub use sync::{CategoryOutcome, SyncOrchestrator, SyncReport};
