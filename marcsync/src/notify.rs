//! Run notifications.
//!
//! Every run ends with exactly one notification: the run summary on
//! success, or the error on failure. Delivery is behind the [`Notifier`]
//! trait; the crate ships [`LogNotifier`], which writes notifications to
//! the log, and leaves mail delivery to the host.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use tracing::{error, info};

/// Subject line of run notifications.
pub const RUN_SUBJECT: &str = "MARC export update";

/// Urgency of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Failures that need an operator.
    High,
    /// Routine run summaries.
    Normal,
}

impl Priority {
    /// Numeric level as used by mail `X-Priority` headers (1 highest).
    pub fn level(&self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Normal => 5,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => f.write_str("high"),
            Priority::Normal => f.write_str("normal"),
        }
    }
}

/// Delivery failure.
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers notifications.
pub trait Notifier {
    /// Sends one notification.
    fn notify(
        &self,
        subject: &str,
        body: &str,
        priority: Priority,
        recipient: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(
        &self,
        subject: &str,
        body: &str,
        priority: Priority,
        recipient: Option<&str>,
    ) -> Result<(), NotifyError> {
        let recipient = recipient.unwrap_or("-");
        match priority {
            Priority::High => error!(subject, recipient, priority = %priority, "{}", body),
            Priority::Normal => info!(subject, recipient, priority = %priority, "{}", body),
        }
        Ok(())
    }
}

/// Per-process reporting context.
///
/// Built once at startup and handed to whatever needs to report.
pub struct RunContext {
    /// Sender address shown in notifications.
    pub sender: String,
    /// Where notifications go; `None` leaves the choice to the notifier.
    pub recipient: Option<String>,
    notifier: Box<dyn Notifier>,
}

impl RunContext {
    /// Creates a context that reports through `notifier`.
    pub fn new(sender: impl Into<String>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            sender: sender.into(),
            recipient: None,
            notifier,
        }
    }

    /// Sets the recipient.
    pub fn with_recipient(mut self, recipient: Option<String>) -> Self {
        self.recipient = recipient;
        self
    }

    /// Sends the run summary at normal priority.
    pub fn report_success(&self, summary: &str) -> Result<(), NotifyError> {
        self.notifier.notify(
            RUN_SUBJECT,
            summary,
            Priority::Normal,
            self.recipient.as_deref(),
        )
    }

    /// Sends a failure report, with the error's cause chain, at high
    /// priority.
    pub fn report_failure(&self, err: &dyn StdError) -> Result<(), NotifyError> {
        let body = format!("An error occurred: {}", error_chain(err));
        self.notifier
            .notify(RUN_SUBJECT, &body, Priority::High, self.recipient.as_deref())
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

/// `error: cause: cause...`, skipping causes already spelled out by their
/// parent's message.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
