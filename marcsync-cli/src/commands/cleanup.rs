//! Cleanup command - apply the retention policy to the cumulative store.

use std::path::PathBuf;

use marcsync::SyncOrchestrator;

use super::load_config;
use crate::error::CliError;

/// Run the cleanup command.
pub fn run(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let store = config.store_directory.clone();

    // Nothing is downloaded, so the download directory is irrelevant.
    let mut orchestrator = SyncOrchestrator::new(config, ".");
    let report = orchestrator.cleanup()?;

    match report.full_dump_date {
        None => println!(
            "No full dump in {}, nothing pruned",
            store.display()
        ),
        Some(date) => {
            println!(
                "Cleaned up {} (newest full dump {}): {} file(s) removed",
                store.display(),
                date,
                report.removed.len()
            );
            for name in &report.removed {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
