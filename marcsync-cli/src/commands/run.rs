//! Run command - one full synchronization against the FTP server.

use std::path::{Path, PathBuf};

use marcsync::{FtpSession, RunContext, SyncError, SyncOrchestrator, SyncReport};
use tracing::{info, warn};

use super::load_config;
use crate::error::CliError;

/// Arguments for the run command.
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub download_dir: PathBuf,
}

/// Run the run command.
///
/// The summary notification is sent here; failures are reported by the
/// caller.
pub fn run(args: RunArgs, context: &RunContext) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let ftp = config.ftp.clone();

    let mut session = FtpSession::connect(&ftp).map_err(|source| SyncError::Connect {
        host: ftp.host.clone(),
        source,
    })?;

    let mut orchestrator = SyncOrchestrator::new(config, &args.download_dir);
    let result = orchestrator.run(&mut session);

    if let Err(e) = session.quit() {
        warn!(error = %e, "Failed to close FTP session");
    }

    let report = result.map_err(|e| {
        warn!(phase = %orchestrator.phase(), "Run aborted");
        e
    })?;

    log_pipeline_inputs(&report, &args.download_dir);
    let summary = report.summary();
    println!("{}", summary);
    context.report_success(&summary)?;
    Ok(())
}

/// Full dump and differential files are what the conversion pipeline picks
/// up next.
fn log_pipeline_inputs(report: &SyncReport, download_dir: &Path) {
    for file in report.full_dump_files() {
        info!(file = %file.display(), "New full dump ready for conversion");
    }
    for file in report.differential_files() {
        info!(file = %file.display(), "New differential ready for conversion");
    }
    if report.downloaded_count() == 0 {
        info!(download_dir = %download_dir.display(), "Nothing new downloaded");
    }
}
