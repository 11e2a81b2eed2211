//! Synchronization categories.
//!
//! A category is one family of export files (full dumps, differentials,
//! deletion lists, ...) living in one remote directory and recognised by one
//! filename pattern. The set of kinds is fixed; which optional kinds take
//! part in a run is decided by the configuration.

mod matcher;

pub use matcher::{FilenameMatcher, GENERIC_DATED_PATTERN};

use std::fmt;

/// The kinds of export the engine knows about, in synchronization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryKind {
    /// Complete export of the whole title dataset.
    FullDump,
    /// Changes since the previous full dump.
    Differential,
    /// Record IDs to delete.
    DeletionList,
    /// Second deletion list published for the local catalogue.
    SecondDeletionList,
    /// Reference-term hint records.
    ReferenceHints,
    /// Producer error reports.
    ErrorReport,
    /// Changes to authority (controlled vocabulary) records.
    AuthorityDifferential,
}

impl CategoryKind {
    /// Every kind, in the order a run processes them.
    pub const ALL: [CategoryKind; 7] = [
        CategoryKind::FullDump,
        CategoryKind::Differential,
        CategoryKind::DeletionList,
        CategoryKind::SecondDeletionList,
        CategoryKind::ReferenceHints,
        CategoryKind::ErrorReport,
        CategoryKind::AuthorityDifferential,
    ];

    /// Configuration section describing this kind.
    pub fn section(&self) -> &'static str {
        match self {
            CategoryKind::FullDump => "Kompletter Abzug",
            CategoryKind::Differential => "Differenzabzug",
            CategoryKind::DeletionList => "Loeschlisten",
            CategoryKind::SecondDeletionList => "Loeschlisten2",
            CategoryKind::ReferenceHints => "Hinweisabzug",
            CategoryKind::ErrorReport => "Errors",
            CategoryKind::AuthorityDifferential => "Normdatendifferenzabzug",
        }
    }

    /// Whether a configuration must provide this kind.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            CategoryKind::FullDump | CategoryKind::Differential | CategoryKind::DeletionList
        )
    }

    /// Short human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            CategoryKind::FullDump => "full dump",
            CategoryKind::Differential => "differential dump",
            CategoryKind::DeletionList => "deletion list",
            CategoryKind::SecondDeletionList => "second deletion list",
            CategoryKind::ReferenceHints => "reference hints",
            CategoryKind::ErrorReport => "error report",
            CategoryKind::AuthorityDifferential => "authority differential",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A configured category.
#[derive(Debug, Clone)]
pub struct Category {
    /// Which kind of export this is.
    pub kind: CategoryKind,
    /// Compiled filename pattern.
    pub matcher: FilenameMatcher,
    /// Directory on the remote endpoint holding the files.
    pub remote_directory: String,
}

impl Category {
    /// Creates a category.
    pub fn new(
        kind: CategoryKind,
        matcher: FilenameMatcher,
        remote_directory: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            matcher,
            remote_directory: remote_directory.into(),
        }
    }

    /// Section name, used as the category's name in reports.
    pub fn name(&self) -> &'static str {
        self.kind.section()
    }
}
