//! Cumulative store of every accepted export.
//!
//! The store is a flat directory holding a copy of each file the engine has
//! ever accepted, so that the current state of the data can be rebuilt from
//! the last full dump plus everything published after it. Files leave the
//! store only through the retention pass:
//!
//! 1. everything dated before the newest full dump goes, except authority
//!    differentials
//! 2. authority differentials dated more than 10 days before that full dump
//!    go as well
//!
//! Files whose names do not have the dated `name-YYMMDD` shape are never
//! touched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::category::FilenameMatcher;
use crate::date::{DumpDate, AUTHORITY_LOOKBACK_DAYS};
use crate::error::{SyncError, SyncResult};

/// Outcome of a retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Date of the full dump the pass was anchored on. `None` when the store
    /// holds no full dump and nothing was pruned.
    pub full_dump_date: Option<DumpDate>,
    /// Files removed in either phase, in removal order.
    pub removed: Vec<String>,
}

impl CleanupReport {
    /// True if the pass ran.
    pub fn performed(&self) -> bool {
        self.full_dump_date.is_some()
    }
}

/// Local durable archive indexed by filename.
#[derive(Debug, Clone)]
pub struct CumulativeStore {
    directory: PathBuf,
}

impl CumulativeStore {
    /// Creates a handle on `directory`. The directory need not exist yet;
    /// [`absorb`](Self::absorb) creates it.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Opens a store that must already exist.
    ///
    /// # Errors
    ///
    /// [`SyncError::LocalIo`] with `NotFound` if the directory is missing.
    pub fn open_existing(directory: impl Into<PathBuf>) -> SyncResult<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            let source = std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "cumulative store directory is missing",
            );
            return Err(SyncError::local_io(directory, source));
        }
        Ok(Self { directory })
    }

    /// The store directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// True if the store directory exists.
    pub fn exists(&self) -> bool {
        self.directory.is_dir()
    }

    /// Copies `files` into the store, creating it if needed.
    ///
    /// Re-absorbing a file overwrites the stored copy, so the call is
    /// idempotent on the store's file set. A file that already is the
    /// stored copy is left alone.
    pub fn absorb<P: AsRef<Path>>(&self, files: &[P]) -> SyncResult<()> {
        fs::create_dir_all(&self.directory).map_err(|e| SyncError::local_io(&self.directory, e))?;

        for file in files {
            let source = file.as_ref();
            let name = source.file_name().ok_or_else(|| {
                SyncError::local_io(
                    source,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
                )
            })?;
            let target = self.directory.join(name);

            if is_same_file(source, &target) {
                debug!(file = %target.display(), "Already in cumulative store");
                continue;
            }
            fs::copy(source, &target).map_err(|e| SyncError::local_io(&target, e))?;
            debug!(file = %target.display(), "Added to cumulative store");
        }

        Ok(())
    }

    /// Names of the regular files in the store, sorted.
    ///
    /// A missing store directory lists as empty.
    pub fn list(&self) -> SyncResult<Vec<String>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&self.directory).map_err(|e| SyncError::local_io(&self.directory, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SyncError::local_io(&self.directory, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| SyncError::local_io(entry.path(), e))?
                .is_file();
            if is_file {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// The matching file with the latest date.
    ///
    /// Ties on the date keep the lexicographically first name.
    pub fn most_recent(&self, matcher: &FilenameMatcher) -> SyncResult<Option<String>> {
        Ok(self
            .dated(matcher)?
            .into_iter()
            .fold(None::<(DumpDate, String)>, |best, (date, name)| match best {
                Some((best_date, _)) if date <= best_date => best,
                _ => Some((date, name)),
            })
            .map(|(_, name)| name))
    }

    /// Date of the newest export in the store, epoch if there is none.
    ///
    /// Only names with text after the date count, so a deletion list or
    /// error report published ahead of the exports never moves the cutoff.
    pub fn latest_date(&self) -> SyncResult<DumpDate> {
        let anchor = FilenameMatcher::cutoff_anchor();
        match self.most_recent(&anchor)? {
            Some(name) => anchor
                .matches(&name)
                .ok_or(SyncError::NoDateFound { filename: name }),
            None => Ok(DumpDate::EPOCH),
        }
    }

    /// True if the newest file matching `matcher` is dated strictly after
    /// `cutoff`.
    pub fn current_dump_present(
        &self,
        matcher: &FilenameMatcher,
        cutoff: DumpDate,
    ) -> SyncResult<bool> {
        match self.most_recent(matcher)? {
            None => Ok(false),
            Some(name) => {
                let date = matcher
                    .matches(&name)
                    .ok_or(SyncError::NoDateFound { filename: name })?;
                Ok(date > cutoff)
            }
        }
    }

    /// Deletes dated files older than `older_than`.
    ///
    /// Only names with the generic dated shape are considered. Names
    /// matching `exclude` are kept regardless of their date.
    ///
    /// # Returns
    ///
    /// The deleted names.
    pub fn prune(
        &self,
        older_than: DumpDate,
        exclude: Option<&FilenameMatcher>,
    ) -> SyncResult<Vec<String>> {
        let generic = FilenameMatcher::generic();
        let mut removed = Vec::new();

        for (date, name) in self.dated(&generic)? {
            if date >= older_than || exclude.is_some_and(|m| m.is_match(&name)) {
                continue;
            }
            let path = self.directory.join(&name);
            fs::remove_file(&path).map_err(|e| SyncError::local_io(&path, e))?;
            debug!(file = %name, older_than = %older_than, "Pruned from cumulative store");
            removed.push(name);
        }

        Ok(removed)
    }

    /// Applies the retention policy anchored on the newest full dump.
    ///
    /// Does nothing when the store holds no full dump. Otherwise removes
    /// every dated file older than the full dump except the files matching
    /// `authority`, then removes dated files (authority differentials
    /// included) older than the full dump minus the look-back window.
    pub fn cleanup(
        &self,
        full_dump: &FilenameMatcher,
        authority: Option<&FilenameMatcher>,
    ) -> SyncResult<CleanupReport> {
        let Some(newest) = self.most_recent(full_dump)? else {
            info!(store = %self.directory.display(), "No full dump in store, skipping cleanup");
            return Ok(CleanupReport::default());
        };

        let date = full_dump
            .matches(&newest)
            .ok_or(SyncError::NoDateFound { filename: newest })?;

        let mut removed = self.prune(date, authority)?;
        removed.extend(self.prune(date.shift_back(AUTHORITY_LOOKBACK_DAYS), None)?);

        info!(
            full_dump_date = %date,
            removed = removed.len(),
            "Cumulative store cleaned up"
        );

        Ok(CleanupReport {
            full_dump_date: Some(date),
            removed,
        })
    }

    /// Files matching `matcher` with their dates, sorted by name.
    fn dated(&self, matcher: &FilenameMatcher) -> SyncResult<Vec<(DumpDate, String)>> {
        Ok(self
            .list()?
            .into_iter()
            .filter_map(|name| matcher.matches(&name).map(|date| (date, name)))
            .collect())
    }
}

/// True if both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
