//! Compiled filename patterns.

use regex::Regex;

use crate::config::ConfigError;
use crate::date::{extract_date, DateError, DumpDate};

/// Shape shared by every dated file in the cumulative store: a run of
/// non-digits, a dash, then six digits.
pub const GENERIC_DATED_PATTERN: &str = r"^\D*?-(\d{6})";

/// Shape of the store files that anchor the run cutoff: the date must be
/// followed by at least one character, so export tarballs count and names
/// ending in the date (deletion lists, error reports) do not.
pub const CUTOFF_ANCHOR_PATTERN: &str = r"^.+(\d{6}).+";

/// A category's filename pattern, compiled.
///
/// The pattern must contain exactly one capture group, and that group must
/// capture the `YYMMDD` token.
#[derive(Debug, Clone)]
pub struct FilenameMatcher {
    regex: Regex,
    paired: bool,
}

impl FilenameMatcher {
    /// Compiles `pattern`.
    ///
    /// `paired` declares that the producer publishes this category as
    /// companion files (with and without local data) which must be fetched
    /// together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not
    /// compile or does not have exactly one capture group.
    pub fn new(pattern: &str, paired: bool) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len() counts the implicit whole-match group.
        if regex.captures_len() != 2 {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!(
                    "expected exactly one capture group, found {}",
                    regex.captures_len() - 1
                ),
            });
        }

        Ok(Self { regex, paired })
    }

    /// The store-wide "name-dash-6digits" matcher.
    pub fn generic() -> Self {
        Self {
            regex: Regex::new(GENERIC_DATED_PATTERN).expect("generic pattern is valid"),
            paired: false,
        }
    }

    /// The matcher for files that anchor the run cutoff.
    pub fn cutoff_anchor() -> Self {
        Self {
            regex: Regex::new(CUTOFF_ANCHOR_PATTERN).expect("cutoff anchor pattern is valid"),
            paired: false,
        }
    }

    /// Returns the embedded date if `filename` matches and carries a valid
    /// date token.
    pub fn matches(&self, filename: &str) -> Option<DumpDate> {
        self.date_of(filename).ok()
    }

    /// Like [`matches`](Self::matches) but reports why there is no date.
    pub fn date_of(&self, filename: &str) -> Result<DumpDate, DateError> {
        extract_date(filename, &self.regex)
    }

    /// True if the pattern matches at all, date validity aside.
    pub fn is_match(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }

    /// True when the category is published as companion pairs.
    pub fn requires_paired_instances(&self) -> bool {
        self.paired
    }

    /// The pattern source text.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}
