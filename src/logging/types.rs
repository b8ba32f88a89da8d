//! Core logging types: summary entries, status, and the [`Log`] trait.

/// One line of the end-of-run summary.
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    /// Bundle name.
    pub name: String,
    /// Final status of the bundle.
    pub status: SummaryStatus,
    /// Optional detail message (e.g., skip reason or failure description).
    pub message: Option<String>,
}

/// Status shown for a bundle in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStatus {
    /// Bundle converged (or was already converged).
    Ok,
    /// Bundle was not attempted because a dependency did not succeed.
    Skipped,
    /// Bundle would converge; no changes were applied.
    DryRun,
    /// Bundle has at least one failed or refused item.
    Failed,
}

/// Abstraction over logging backends.
///
/// The engine logs through this trait so tests can run it without a global
/// tracing subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a bundle result for the summary.
    fn record_bundle(&self, name: &str, status: SummaryStatus, message: Option<&str>);
}
