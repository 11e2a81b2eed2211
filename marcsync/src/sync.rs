//! One synchronization run.
//!
//! A run walks the configured categories in priority order:
//!
//! ```text
//! Idle → ComputeCutoff → ListAndValidate(c) → Download(c) → Archive(c) → ... → Cleanup → Done
//! ```
//!
//! The cutoff starts one day after the newest export in the cumulative
//! store. Deletion lists and error reports never set it. Once a full dump is accepted every later category is listed from
//! that dump's date instead, since a full dump supersedes everything before
//! it. Two categories use their own cutoff:
//!
//! - reference hints are always listed from the epoch
//! - authority differentials are listed from 10 days before the cutoff, and
//!   skipped altogether when the store already holds one newer than that
//!
//! The first fatal error ends the run. Categories archived before it stay
//! archived.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::category::{Category, CategoryKind};
use crate::config::SyncConfig;
use crate::date::{DumpDate, AUTHORITY_LOOKBACK_DAYS};
use crate::download::Downloader;
use crate::error::SyncResult;
use crate::lister::RemoteLister;
use crate::remote::RemoteSession;
use crate::store::{CleanupReport, CumulativeStore};
use crate::validate;

/// Where a run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Not started.
    Idle,
    /// Reading the store to find the first date to fetch.
    ComputeCutoff,
    /// Listing a category and checking the batch.
    ListAndValidate(CategoryKind),
    /// Fetching an accepted batch.
    Download(CategoryKind),
    /// Copying a fetched batch into the store.
    Archive(CategoryKind),
    /// Applying the retention policy.
    Cleanup,
    /// Finished successfully.
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => f.write_str("idle"),
            RunPhase::ComputeCutoff => f.write_str("computing cutoff"),
            RunPhase::ListAndValidate(kind) => write!(f, "listing {}", kind),
            RunPhase::Download(kind) => write!(f, "downloading {}", kind),
            RunPhase::Archive(kind) => write!(f, "archiving {}", kind),
            RunPhase::Cleanup => f.write_str("cleaning up"),
            RunPhase::Done => f.write_str("done"),
        }
    }
}

/// What happened to one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// New files were fetched and archived.
    Downloaded(Vec<PathBuf>),
    /// Nothing at or after the cutoff.
    NoNewFiles,
    /// Not attempted.
    Skipped(String),
}

/// Per-category entry of a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    /// Category kind.
    pub kind: CategoryKind,
    /// Filename pattern the category was listed with.
    pub pattern: String,
    /// Cutoff the category was listed from.
    pub cutoff: DumpDate,
    /// Result.
    pub outcome: CategoryOutcome,
}

impl CategoryReport {
    /// Local paths of the files fetched for this category.
    pub fn files(&self) -> &[PathBuf] {
        match &self.outcome {
            CategoryOutcome::Downloaded(files) => files,
            _ => &[],
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Cutoff derived from the store at the start of the run.
    pub initial_cutoff: DumpDate,
    /// Date of the full dump accepted in this run, if any.
    pub full_dump_date: Option<DumpDate>,
    /// One entry per configured category, in processing order.
    pub categories: Vec<CategoryReport>,
    /// Retention pass result.
    pub cleanup: CleanupReport,
}

impl SyncReport {
    /// The entry for `kind`, if that category is configured.
    pub fn category(&self, kind: CategoryKind) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.kind == kind)
    }

    /// Full-dump files fetched in this run, for the conversion pipeline.
    pub fn full_dump_files(&self) -> &[PathBuf] {
        self.files_of(CategoryKind::FullDump)
    }

    /// Differential files fetched in this run, for the conversion pipeline.
    pub fn differential_files(&self) -> &[PathBuf] {
        self.files_of(CategoryKind::Differential)
    }

    /// Total number of files fetched.
    pub fn downloaded_count(&self) -> usize {
        self.categories.iter().map(|c| c.files().len()).sum()
    }

    /// Human-readable summary for the run notification.
    pub fn summary(&self) -> String {
        let mut text = String::new();

        for entry in &self.categories {
            match &entry.outcome {
                CategoryOutcome::Downloaded(files) => {
                    text.push_str(&format!("[{}] Successfully downloaded:\n", entry.kind.section()));
                    for file in files {
                        let name = file.file_name().unwrap_or(file.as_os_str());
                        text.push_str(&format!("  {}\n", name.to_string_lossy()));
                    }
                }
                CategoryOutcome::NoNewFiles => text.push_str(&format!(
                    "[{}] No more recent file for pattern \"{}\" since {}\n",
                    entry.kind.section(),
                    entry.pattern,
                    entry.cutoff
                )),
                CategoryOutcome::Skipped(reason) => text.push_str(&format!(
                    "[{}] Skipped: {}\n",
                    entry.kind.section(),
                    reason
                )),
            }
        }

        match self.cleanup.full_dump_date {
            Some(date) => text.push_str(&format!(
                "Cleanup anchored on full dump {}: removed {} file(s)\n",
                date,
                self.cleanup.removed.len()
            )),
            None => text.push_str("Cleanup skipped: no full dump in the cumulative store\n"),
        }

        text
    }

    fn files_of(&self, kind: CategoryKind) -> &[PathBuf] {
        self.category(kind).map(CategoryReport::files).unwrap_or(&[])
    }
}

/// Drives one synchronization run.
#[derive(Debug)]
pub struct SyncOrchestrator {
    config: SyncConfig,
    lister: RemoteLister,
    downloader: Downloader,
    phase: RunPhase,
}

impl SyncOrchestrator {
    /// Creates an orchestrator fetching into `download_dir`.
    ///
    /// The listing retry policy is taken from the FTP configuration.
    pub fn new(config: SyncConfig, download_dir: impl Into<PathBuf>) -> Self {
        let lister = RemoteLister::new(config.ftp.listing_retry.clone());
        Self {
            config,
            lister,
            downloader: Downloader::new(download_dir),
            phase: RunPhase::Idle,
        }
    }

    /// Replaces the lister.
    pub fn with_lister(mut self, lister: RemoteLister) -> Self {
        self.lister = lister;
        self
    }

    /// The phase reached so far. After a failed run this is the phase that
    /// failed.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// The configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The store directory.
    pub fn store_directory(&self) -> &Path {
        &self.config.store_directory
    }

    /// Opens the cumulative store, which must exist.
    pub fn open_store(&self) -> SyncResult<CumulativeStore> {
        CumulativeStore::open_existing(&self.config.store_directory)
    }

    /// The first date a run would fetch: the day after the newest export
    /// in the store, or the epoch when there is none.
    pub fn compute_cutoff(&self) -> SyncResult<DumpDate> {
        Ok(self.open_store()?.latest_date()?.successor())
    }

    /// Runs one synchronization over `session`.
    pub fn run<S: RemoteSession + ?Sized>(&mut self, session: &mut S) -> SyncResult<SyncReport> {
        self.enter(RunPhase::ComputeCutoff);
        let store = self.open_store()?;
        let initial_cutoff = store.latest_date()?.successor();
        info!(cutoff = %initial_cutoff, store = %store.directory().display(), "Starting run");

        let mut cutoff = initial_cutoff;
        let mut full_dump_date = None;
        let mut categories = Vec::new();

        let configured = self.config.categories.clone();
        for category in &configured {
            let report = match category.kind {
                CategoryKind::FullDump => {
                    let (report, date) = self.sync_full_dump(session, &store, category, cutoff)?;
                    if let Some(date) = date {
                        info!(date = %date, "Full dump accepted, resetting cutoff");
                        cutoff = date;
                        full_dump_date = Some(date);
                    }
                    report
                }
                CategoryKind::ReferenceHints => {
                    self.sync_category(session, &store, category, DumpDate::EPOCH)?
                }
                CategoryKind::AuthorityDifferential => {
                    let shifted = cutoff.shift_back(AUTHORITY_LOOKBACK_DAYS);
                    if store.current_dump_present(&category.matcher, shifted)? {
                        info!(cutoff = %shifted, "Authority differential already present, skipping");
                        CategoryReport {
                            kind: category.kind,
                            pattern: category.matcher.pattern().to_string(),
                            cutoff: shifted,
                            outcome: CategoryOutcome::Skipped(format!(
                                "\"{}\" already present",
                                category.name()
                            )),
                        }
                    } else {
                        self.sync_category(session, &store, category, shifted)?
                    }
                }
                _ => self.sync_category(session, &store, category, cutoff)?,
            };
            categories.push(report);
        }

        let cleanup = self.cleanup_store(&store)?;
        self.enter(RunPhase::Done);

        Ok(SyncReport {
            initial_cutoff,
            full_dump_date,
            categories,
            cleanup,
        })
    }

    /// Applies the retention policy to the store without syncing.
    pub fn cleanup(&mut self) -> SyncResult<CleanupReport> {
        let store = self.open_store()?;
        let report = self.cleanup_store(&store)?;
        self.enter(RunPhase::Done);
        Ok(report)
    }

    fn cleanup_store(&mut self, store: &CumulativeStore) -> SyncResult<CleanupReport> {
        self.enter(RunPhase::Cleanup);
        let Some(full) = self.config.category(CategoryKind::FullDump) else {
            return Ok(CleanupReport::default());
        };
        let authority = self
            .config
            .category(CategoryKind::AuthorityDifferential)
            .map(|c| &c.matcher);
        store.cleanup(&full.matcher, authority)
    }

    fn sync_full_dump<S: RemoteSession + ?Sized>(
        &mut self,
        session: &mut S,
        store: &CumulativeStore,
        category: &Category,
        cutoff: DumpDate,
    ) -> SyncResult<(CategoryReport, Option<DumpDate>)> {
        self.enter(RunPhase::ListAndValidate(category.kind));
        let files = self.list(session, category, cutoff)?;
        let date = validate::check_full_dump(&category.matcher, &files)?;
        let report = self.fetch_and_archive(session, store, category, cutoff, files)?;
        Ok((report, date))
    }

    fn sync_category<S: RemoteSession + ?Sized>(
        &mut self,
        session: &mut S,
        store: &CumulativeStore,
        category: &Category,
        cutoff: DumpDate,
    ) -> SyncResult<CategoryReport> {
        self.enter(RunPhase::ListAndValidate(category.kind));
        let files = self.list(session, category, cutoff)?;
        validate::check_batch(category, &files)?;
        self.fetch_and_archive(session, store, category, cutoff, files)
    }

    fn list<S: RemoteSession + ?Sized>(
        &self,
        session: &mut S,
        category: &Category,
        cutoff: DumpDate,
    ) -> SyncResult<Vec<String>> {
        self.lister
            .list(session, &category.remote_directory, &category.matcher, cutoff)
    }

    fn fetch_and_archive<S: RemoteSession + ?Sized>(
        &mut self,
        session: &mut S,
        store: &CumulativeStore,
        category: &Category,
        cutoff: DumpDate,
        files: Vec<String>,
    ) -> SyncResult<CategoryReport> {
        let outcome = if files.is_empty() {
            info!(category = category.name(), cutoff = %cutoff, "No new files");
            CategoryOutcome::NoNewFiles
        } else {
            self.enter(RunPhase::Download(category.kind));
            let paths = self.downloader.fetch_all(session, &files)?;

            self.enter(RunPhase::Archive(category.kind));
            store.absorb(&paths)?;

            info!(category = category.name(), count = paths.len(), "Category synchronized");
            CategoryOutcome::Downloaded(paths)
        };

        Ok(CategoryReport {
            kind: category.kind,
            pattern: category.matcher.pattern().to_string(),
            cutoff,
            outcome,
        })
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(from = %self.phase, to = %phase, "Run phase");
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<(CategoryKind, CategoryOutcome)>) -> SyncReport {
        SyncReport {
            initial_cutoff: "200101".parse().unwrap(),
            full_dump_date: None,
            categories: outcomes
                .into_iter()
                .map(|(kind, outcome)| CategoryReport {
                    kind,
                    pattern: "^x-(\\d{6})$".to_string(),
                    cutoff: "200101".parse().unwrap(),
                    outcome,
                })
                .collect(),
            cleanup: CleanupReport::default(),
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(
            RunPhase::Download(CategoryKind::DeletionList).to_string(),
            "downloading deletion list"
        );
        assert_eq!(RunPhase::Cleanup.to_string(), "cleaning up");
    }

    #[test]
    fn test_report_file_accessors() {
        let report = report(vec![
            (
                CategoryKind::FullDump,
                CategoryOutcome::Downloaded(vec![PathBuf::from("/tmp/SA-MARC-ixtheo-200102.tar.gz")]),
            ),
            (CategoryKind::Differential, CategoryOutcome::NoNewFiles),
        ]);

        assert_eq!(report.full_dump_files().len(), 1);
        assert!(report.differential_files().is_empty());
        assert_eq!(report.downloaded_count(), 1);
        assert!(report.category(CategoryKind::ErrorReport).is_none());
    }

    #[test]
    fn test_summary_lists_every_category() {
        let report = report(vec![
            (
                CategoryKind::FullDump,
                CategoryOutcome::Downloaded(vec![PathBuf::from("/tmp/SA-MARC-ixtheo-200102.tar.gz")]),
            ),
            (CategoryKind::Differential, CategoryOutcome::NoNewFiles),
            (
                CategoryKind::AuthorityDifferential,
                CategoryOutcome::Skipped("already present".to_string()),
            ),
        ]);

        let summary = report.summary();
        assert!(summary.contains("[Kompletter Abzug] Successfully downloaded:\n  SA-MARC-ixtheo-200102.tar.gz\n"));
        assert!(summary.contains("[Differenzabzug] No more recent file"));
        assert!(summary.contains("[Normdatendifferenzabzug] Skipped: already present"));
        assert!(summary.contains("Cleanup skipped"));
    }
}
