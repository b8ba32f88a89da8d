//! The console [`Log`] used by commands.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::log_file_path;
use super::types::{Log, SummaryEntry, SummaryStatus};

/// Forward the `fn(&self, &str)` methods of [`Log`] to inherent methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Emits engine messages as tracing events and collects one summary line
/// per bundle for the end of the run.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<SummaryEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`.  Only remembers where the log file is, so the
    /// summary can point at it.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded entries (test-only).
    #[cfg(test)]
    pub(crate) fn summary_entries(&self) -> Vec<SummaryEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "dots::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message.  Reaches the console only when verbose.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "dots::dry_run", "{msg}");
    }

    /// Record a bundle result for the summary.
    pub fn record_bundle(&self, name: &str, status: SummaryStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(SummaryEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed bundles.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == SummaryStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded bundles.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self) {
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let mut ok = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for entry in &entries {
            let (icon, color) = match entry.status {
                SummaryStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                SummaryStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                SummaryStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                SummaryStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        println!();
        let total = ok + skipped + dry_run + failed;
        self.info(&format!(
            "{total} bundles: \x1b[32m{ok} ok\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_bundle(&self, name: &str, status: SummaryStatus, message: Option<&str>) {
        self.record_bundle(name, status, message);
    }
}
