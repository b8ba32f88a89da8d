//! Rendering of a [`RunReport`] for the console or as JSON.
use anyhow::{Context as _, Result};

use crate::engine::{BundleOutcome, BundleStatus, LinkApplied, PackageApplied, RunReport};
use crate::logging::{Log, SummaryStatus};

/// Number of items a bundle changed (or would change, under dry-run).
#[must_use]
pub fn change_count(outcome: &BundleOutcome) -> usize {
    let installed = outcome
        .packages
        .iter()
        .filter(|p| p.applied == PackageApplied::Installed)
        .count();
    let linked = outcome
        .links
        .iter()
        .filter(|l| {
            matches!(
                l.applied,
                LinkApplied::Created | LinkApplied::Replaced | LinkApplied::Removed
            )
        })
        .count();
    installed + linked
}

/// Map an outcome onto the summary status shown at the end of a run.
#[must_use]
pub fn summary_status(outcome: &BundleOutcome, dry_run: bool) -> SummaryStatus {
    match outcome.status {
        BundleStatus::Failed(_) => SummaryStatus::Failed,
        BundleStatus::Skipped(_) => SummaryStatus::Skipped,
        BundleStatus::Succeeded if dry_run && change_count(outcome) > 0 => SummaryStatus::DryRun,
        BundleStatus::Succeeded | BundleStatus::Pending => SummaryStatus::Ok,
    }
}

fn summary_message(outcome: &BundleOutcome, dry_run: bool) -> Option<String> {
    match &outcome.status {
        BundleStatus::Failed(reason) | BundleStatus::Skipped(reason) => Some(reason.clone()),
        BundleStatus::Succeeded => {
            let changes = change_count(outcome);
            match (changes, dry_run) {
                (0, _) => None,
                (n, true) => Some(format!("{n} pending")),
                (n, false) => Some(format!("{n} changed")),
            }
        }
        BundleStatus::Pending => None,
    }
}

/// Log every recorded issue and feed each outcome into the run summary.
pub fn record(log: &dyn Log, report: &RunReport) {
    for outcome in &report.outcomes {
        for issue in outcome.issues() {
            log.debug(&format!("{}: {issue}", outcome.name));
        }
        let message = summary_message(outcome, report.dry_run);
        log.record_bundle(
            &outcome.name,
            summary_status(outcome, report.dry_run),
            message.as_deref(),
        );
    }
    if report.interrupted {
        log.warn("run interrupted; remaining bundles were not processed");
    }
}

/// Serialize the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serializing run report")
}

/// Write the report to stdout as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
#[allow(clippy::print_stdout)]
pub fn print_json(report: &RunReport) -> Result<()> {
    println!("{}", to_json(report)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::test_helpers::RecordingLog;
    use crate::engine::{Mode, PackageResult, PackageState, Scope};

    fn outcome(name: &str, status: BundleStatus, installed: bool) -> BundleOutcome {
        let mut outcome = BundleOutcome::new(name);
        outcome.packages = vec![PackageResult {
            package: "zsh".into(),
            observed: if installed {
                PackageState::Missing
            } else {
                PackageState::Present
            },
            applied: if installed {
                PackageApplied::Installed
            } else {
                PackageApplied::Unchanged
            },
        }];
        outcome.status = status;
        outcome
    }

    fn report(dry_run: bool, outcomes: Vec<BundleOutcome>) -> RunReport {
        RunReport {
            mode: Mode::Apply,
            scope: Scope::Both,
            dry_run,
            interrupted: false,
            outcomes,
        }
    }

    #[test]
    fn summary_status_per_outcome() {
        let changed = outcome("shell", BundleStatus::Succeeded, true);
        let unchanged = outcome("base", BundleStatus::Succeeded, false);
        assert_eq!(summary_status(&changed, true), SummaryStatus::DryRun);
        assert_eq!(summary_status(&changed, false), SummaryStatus::Ok);
        assert_eq!(summary_status(&unchanged, true), SummaryStatus::Ok);
        assert_eq!(
            summary_status(&outcome("x", BundleStatus::Skipped("dep".into()), false), false),
            SummaryStatus::Skipped
        );
    }

    #[test]
    fn summary_messages() {
        assert_eq!(
            summary_message(&outcome("shell", BundleStatus::Succeeded, true), false).as_deref(),
            Some("1 changed")
        );
        assert_eq!(
            summary_message(&outcome("shell", BundleStatus::Succeeded, true), true).as_deref(),
            Some("1 pending")
        );
        assert_eq!(
            summary_message(&outcome("base", BundleStatus::Failed("boom".into()), false), false)
                .as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn removed_links_count_as_changes() {
        use crate::engine::{DesiredState, LinkAction, LinkActionKind, LinkResult};
        use crate::registry::LinkType;
        use crate::resources::Observation;
        use std::path::PathBuf;

        let mut removed = BundleOutcome::new("shell");
        removed.status = BundleStatus::Succeeded;
        removed.links = vec![LinkResult {
            action: LinkAction {
                source: PathBuf::from("/repo/shell/zshrc"),
                target: PathBuf::from("/home/u/.zshrc"),
                link_type: LinkType::Symlink,
                desired: DesiredState::SymlinkTo {
                    source: PathBuf::from("/repo/shell/zshrc"),
                },
                observed: Observation::SymlinkTo(PathBuf::from("/repo/shell/zshrc")),
                kind: LinkActionKind::AlreadySatisfied,
            },
            applied: LinkApplied::Removed,
        }];
        assert_eq!(change_count(&removed), 1);
        assert_eq!(summary_message(&removed, false).as_deref(), Some("1 changed"));
    }

    #[test]
    fn record_feeds_every_bundle_into_summary() {
        let log = RecordingLog::default();
        let mut r = report(
            false,
            vec![
                outcome("base", BundleStatus::Succeeded, false),
                outcome("shell", BundleStatus::Skipped("dependency 'base' failed".into()), false),
            ],
        );
        r.interrupted = true;
        record(&log, &r);
        assert_eq!(log.at("bundle"), vec!["base", "shell"]);
        assert!(log.at("debug")[0].starts_with("shell: "));
        assert_eq!(log.at("warn").len(), 1);
    }

    #[test]
    fn json_is_parseable() {
        let json = to_json(&report(true, vec![outcome("base", BundleStatus::Succeeded, true)])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["outcomes"][0]["packages"][0]["applied"]["state"], "installed");
    }
}
