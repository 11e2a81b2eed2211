//! Remote listing filtered by pattern and cutoff date.

use tracing::{debug, info};

use crate::category::FilenameMatcher;
use crate::date::DumpDate;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemoteError, RemoteSession};
use crate::retry::RetryPolicy;

/// Lists the remote files of a category that are not older than a cutoff.
#[derive(Debug, Clone)]
pub struct RemoteLister {
    retry: RetryPolicy,
}

impl Default for RemoteLister {
    fn default() -> Self {
        Self::new(RetryPolicy::listing())
    }
}

impl RemoteLister {
    /// Creates a lister that retries listings according to `retry`.
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// The listing retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Changes into `directory` and returns the names matching `matcher`
    /// whose date is at or after `cutoff`, sorted.
    ///
    /// # Errors
    ///
    /// - [`SyncError::RemoteDirectory`] if the directory cannot be entered.
    ///   This is a configuration fault and is not retried.
    /// - [`SyncError::Listing`] if the listing still fails after the retry
    ///   policy is exhausted.
    pub fn list<S: RemoteSession + ?Sized>(
        &self,
        session: &mut S,
        directory: &str,
        matcher: &FilenameMatcher,
        cutoff: DumpDate,
    ) -> SyncResult<Vec<String>> {
        session
            .change_dir(directory)
            .map_err(|source| SyncError::RemoteDirectory {
                directory: directory.to_string(),
                source,
            })?;

        let names = self
            .retry
            .run(|_| session.list_names(), RemoteError::is_transient)
            .map_err(|source| SyncError::Listing {
                directory: directory.to_string(),
                attempts: self.retry.max_attempts(),
                source,
            })?;

        let mut selected: Vec<String> = names
            .into_iter()
            .filter(|name| match matcher.matches(name) {
                Some(date) => date >= cutoff,
                None => false,
            })
            .collect();
        selected.sort();

        debug!(
            directory,
            pattern = matcher.pattern(),
            cutoff = %cutoff,
            count = selected.len(),
            "Listed remote candidates"
        );
        if !selected.is_empty() {
            info!(directory, files = ?selected, "Found new remote files");
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::remote::TransferError;

    /// Session whose listing fails a fixed number of times.
    struct FlakySession {
        names: Vec<String>,
        failures_left: u32,
        list_calls: u32,
        missing_dirs: Vec<String>,
    }

    impl FlakySession {
        fn new(names: &[&str], failures: u32) -> Self {
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
                failures_left: failures,
                list_calls: 0,
                missing_dirs: Vec::new(),
            }
        }
    }

    impl RemoteSession for FlakySession {
        fn change_dir(&mut self, directory: &str) -> Result<(), RemoteError> {
            if self.missing_dirs.iter().any(|d| d == directory) {
                return Err(RemoteError::Protocol("550 No such directory".into()));
            }
            Ok(())
        }

        fn list_names(&mut self) -> Result<Vec<String>, RemoteError> {
            self.list_calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(RemoteError::Protocol("425 Can't open data connection".into()));
            }
            Ok(self.names.clone())
        }

        fn retrieve(&mut self, _: &str, _: &mut dyn Write) -> Result<u64, TransferError> {
            Ok(0)
        }
    }

    fn full_dump_matcher() -> FilenameMatcher {
        FilenameMatcher::new(r"^SA-MARC-ixtheo-(\d\d\d\d\d\d)\.tar\.gz$", false).unwrap()
    }

    fn fast_lister() -> RemoteLister {
        RemoteLister::new(RetryPolicy::linear(3, Duration::ZERO))
    }

    fn date(token: &str) -> DumpDate {
        token.parse().unwrap()
    }

    #[test]
    fn test_default_uses_listing_policy() {
        assert_eq!(RemoteLister::default().retry_policy(), &RetryPolicy::listing());
    }

    #[test]
    fn test_lists_files_at_or_after_cutoff() {
        let mut session = FlakySession::new(
            &[
                "SA-MARC-ixtheo-200103.tar.gz",
                "SA-MARC-ixtheo-191231.tar.gz",
                "SA-MARC-ixtheo-200102.tar.gz",
                "SA-MARC-ixtheo-200101.tar.gz",
                "TA-MARC-ixtheo-200102.tar.gz",
            ],
            0,
        );

        let files = fast_lister()
            .list(&mut session, "/ixtheo", &full_dump_matcher(), date("200102"))
            .unwrap();

        assert_eq!(
            files,
            vec!["SA-MARC-ixtheo-200102.tar.gz", "SA-MARC-ixtheo-200103.tar.gz"]
        );
    }

    #[test]
    fn test_unpaired_category_returns_every_match() {
        let mut session = FlakySession::new(
            &["SA-MARC-ixtheo-200102.tar.gz", "SA-MARC-ixtheo-200103.tar.gz"],
            0,
        );
        let files = fast_lister()
            .list(&mut session, "/ixtheo", &full_dump_matcher(), date("200101"))
            .unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_epoch_cutoff_lists_everything() {
        let mut session = FlakySession::new(&["SA-MARC-ixtheo-000101.tar.gz"], 0);
        let files = fast_lister()
            .list(&mut session, "/ixtheo", &full_dump_matcher(), DumpDate::EPOCH)
            .unwrap();
        assert_eq!(files, vec!["SA-MARC-ixtheo-000101.tar.gz"]);
    }

    #[test]
    fn test_empty_listing_is_not_an_error() {
        let mut session = FlakySession::new(&[], 0);
        let files = fast_lister()
            .list(&mut session, "/ixtheo", &full_dump_matcher(), DumpDate::EPOCH)
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_retries_transient_listing_failures() {
        let mut session = FlakySession::new(&["SA-MARC-ixtheo-200102.tar.gz"], 2);
        let files = fast_lister()
            .list(&mut session, "/ixtheo", &full_dump_matcher(), DumpDate::EPOCH)
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(session.list_calls, 3);
    }

    #[test]
    fn test_listing_exhaustion_is_fatal() {
        let mut session = FlakySession::new(&["SA-MARC-ixtheo-200102.tar.gz"], 5);
        let result =
            fast_lister().list(&mut session, "/ixtheo", &full_dump_matcher(), DumpDate::EPOCH);

        assert!(matches!(
            result,
            Err(SyncError::Listing { attempts: 3, .. })
        ));
        assert_eq!(session.list_calls, 3);
    }

    #[test]
    fn test_bad_directory_is_not_retried() {
        let mut session = FlakySession::new(&[], 0);
        session.missing_dirs.push("/nowhere".to_string());

        let result =
            fast_lister().list(&mut session, "/nowhere", &full_dump_matcher(), DumpDate::EPOCH);

        assert!(matches!(result, Err(SyncError::RemoteDirectory { .. })));
        assert_eq!(session.list_calls, 0);
    }
}
