//! Six-digit `YYMMDD` dates embedded in export filenames.
//!
//! Every export published by the remote endpoint carries its generation date
//! as a zero-padded `YYMMDD` token (e.g. `SA-MARC-ixtheo-200102.tar.gz`).
//! [`DumpDate`] wraps that token in a value type backed by a real calendar
//! date so that date arithmetic is calendar-correct, while keeping the
//! property the rest of the engine relies on: ordering two dates is the same
//! as comparing their 6-digit encodings byte by byte.
//!
//! All dates live in the years 2000-2099. The two-digit year is always read
//! as `20YY`; this is what keeps chronological and lexicographic ordering in
//! agreement.
//!
//! The all-zero token `000000` is the [`DumpDate::EPOCH`] sentinel and means
//! "no lower bound". It sorts before every real date.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use thiserror::Error;

/// Encoded form of the epoch sentinel.
pub const EPOCH_TOKEN: &str = "000000";

/// Trailing window kept for authority differentials, in days.
pub const AUTHORITY_LOOKBACK_DAYS: u64 = 10;

/// Century added to the two-digit year.
const CENTURY: i32 = 2000;

/// Errors produced while decoding dates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The filename does not match the pattern that should carry a date.
    #[error("\"{0}\" does not contain a date")]
    NoDateFound(String),

    /// The token is not six digits or is not a calendar date.
    #[error("invalid date token \"{0}\"")]
    InvalidToken(String),
}

/// A `YYMMDD` date or the epoch sentinel.
///
/// `None` is the epoch; `Option`'s ordering puts it before every real date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DumpDate(Option<NaiveDate>);

impl DumpDate {
    /// The "no lower bound" sentinel, encoded as `000000`.
    pub const EPOCH: DumpDate = DumpDate(None);

    /// Creates a date from a full calendar date.
    ///
    /// Returns `None` when the year is outside 2000-2099 and so cannot be
    /// encoded in six digits.
    pub fn from_calendar(date: NaiveDate) -> Option<Self> {
        if (CENTURY..CENTURY + 100).contains(&date.year()) {
            Some(Self(Some(date)))
        } else {
            None
        }
    }

    /// Creates a date from year (2000-2099), month and day.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(Self::from_calendar)
    }

    /// Returns true for the epoch sentinel.
    pub fn is_epoch(&self) -> bool {
        self.0.is_none()
    }

    /// The underlying calendar date, `None` for the epoch.
    pub fn calendar(&self) -> Option<NaiveDate> {
        self.0
    }

    /// Returns the next calendar day.
    ///
    /// The epoch maps to itself. So does 991231, the last encodable day.
    pub fn successor(&self) -> DumpDate {
        match self.0 {
            None => Self::EPOCH,
            Some(date) => date
                .succ_opt()
                .and_then(Self::from_calendar)
                .unwrap_or(*self),
        }
    }

    /// Returns the date `days` calendar days earlier.
    ///
    /// Results before 2000-01-01 saturate to the epoch, which keeps the
    /// operation monotonic in `days`.
    pub fn shift_back(&self, days: u64) -> DumpDate {
        match self.0 {
            None => Self::EPOCH,
            Some(date) => date
                .checked_sub_days(Days::new(days))
                .and_then(Self::from_calendar)
                .unwrap_or(Self::EPOCH),
        }
    }
}

impl fmt::Display for DumpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str(EPOCH_TOKEN),
            Some(date) => write!(
                f,
                "{:02}{:02}{:02}",
                date.year() - CENTURY,
                date.month(),
                date.day()
            ),
        }
    }
}

impl FromStr for DumpDate {
    type Err = DateError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateError::InvalidToken(token.to_string()));
        }
        if token == EPOCH_TOKEN {
            return Ok(Self::EPOCH);
        }

        // All six bytes are ASCII digits, so these cannot fail.
        let field = |range: std::ops::Range<usize>| -> u32 {
            token[range].parse().unwrap_or_default()
        };
        let year = CENTURY + field(0..2) as i32;

        Self::from_ymd(year, field(2..4), field(4..6))
            .ok_or_else(|| DateError::InvalidToken(token.to_string()))
    }
}

/// Extracts the date carried by the single capture group of `pattern`.
///
/// # Errors
///
/// - [`DateError::NoDateFound`] if the pattern does not match `filename`
/// - [`DateError::InvalidToken`] if the captured token is not a valid date
pub fn extract_date(filename: &str, pattern: &Regex) -> Result<DumpDate, DateError> {
    let token = pattern
        .captures(filename)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| DateError::NoDateFound(filename.to_string()))?;

    token.as_str().parse()
}
