//! Status command - show what the next run would start from.

use std::path::PathBuf;

use marcsync::date::AUTHORITY_LOOKBACK_DAYS;
use marcsync::{CumulativeStore, SyncConfig, SyncResult};

use super::load_config;
use crate::error::CliError;

/// Run the status command.
pub fn run(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    for line in describe(&config)? {
        println!("{}", line);
    }
    Ok(())
}

/// Lines describing the store and the cutoffs derived from it.
fn describe(config: &SyncConfig) -> SyncResult<Vec<String>> {
    let store = CumulativeStore::open_existing(&config.store_directory)?;
    let cutoff = store.latest_date()?.successor();

    let mut lines = vec![
        format!("Cumulative store: {}", store.directory().display()),
        format!("Files in store:   {}", store.list()?.len()),
        format!("Next cutoff:      {}", cutoff),
        format!(
            "Authority cutoff: {}",
            cutoff.shift_back(AUTHORITY_LOOKBACK_DAYS)
        ),
        String::from("Most recent file per category:"),
    ];

    for category in &config.categories {
        let newest = store.most_recent(&category.matcher)?;
        lines.push(format!(
            "  {:<24} {}",
            category.name(),
            newest.as_deref().unwrap_or("-")
        ));
    }

    Ok(lines)
}
