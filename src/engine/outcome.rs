//! Per-bundle results and the run report.
use std::fmt;

use serde::Serialize;

use super::planner::{LinkAction, LinkActionKind};
use crate::error::ReconcileError;

/// Observed state of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PackageState {
    /// Installed.
    Present,
    /// Not installed.
    Missing,
    /// The probe could not answer.
    Unknown(String),
}

/// What happened to a package during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PackageApplied {
    /// Nothing needed doing.
    Unchanged,
    /// Installed by this run (or would be, under dry-run).
    Installed,
    /// The installer failed.
    Failed(String),
    /// Not attempted (check mode, or state unknown).
    NotAttempted,
}

/// Result for one package of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageResult {
    /// Package name.
    pub package: String,
    /// State before any action.
    pub observed: PackageState,
    /// Action taken.
    pub applied: PackageApplied,
}

/// What happened to a link during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LinkApplied {
    /// Already satisfied.
    Unchanged,
    /// Created by this run (or would be, under dry-run).
    Created,
    /// An existing symlink or file was replaced under force.
    Replaced,
    /// A satisfied link was removed by an uninstall run.
    Removed,
    /// Left alone because the target is occupied.
    Refused(String),
    /// Creation was attempted and failed.
    Failed(String),
    /// Not attempted (check mode, or an earlier package failure).
    NotAttempted,
}

/// Result for one dotfile mapping of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkResult {
    /// The planned action.
    #[serde(flatten)]
    pub action: LinkAction,
    /// What was done about it.
    pub applied: LinkApplied,
}

/// Final status of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum BundleStatus {
    /// Not processed yet.
    Pending,
    /// Converged (Apply) or fully converged already (Check).
    Succeeded,
    /// At least one item failed, was refused, or is deficient.
    Failed(String),
    /// Not attempted because a dependency did not succeed.
    Skipped(String),
}

impl BundleStatus {
    /// Returns `true` for `Failed` or `Skipped`.
    #[must_use]
    pub const fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Skipped(_))
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Everything the engine learned and did for one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleOutcome {
    /// Bundle name.
    pub name: String,
    /// Package results, in declaration order.
    pub packages: Vec<PackageResult>,
    /// Link results, in declaration order.
    pub links: Vec<LinkResult>,
    /// Final status.
    #[serde(flatten)]
    pub status: BundleStatus,
}

impl BundleOutcome {
    /// A pending outcome with no results.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
            links: Vec::new(),
            status: BundleStatus::Pending,
        }
    }

    /// Every recorded runtime condition of this bundle, as typed errors.
    #[must_use]
    pub fn issues(&self) -> Vec<ReconcileError> {
        let mut issues = Vec::new();
        if let BundleStatus::Skipped(reason) = &self.status {
            issues.push(ReconcileError::Skipped {
                bundle: self.name.clone(),
                upstream: reason.clone(),
            });
        }
        for pkg in &self.packages {
            if let PackageState::Unknown(reason) = &pkg.observed {
                issues.push(ReconcileError::ProbeUnavailable {
                    resource: pkg.package.clone(),
                    reason: reason.clone(),
                });
            }
            if let PackageApplied::Failed(reason) = &pkg.applied {
                issues.push(ReconcileError::InstallFailure {
                    package: pkg.package.clone(),
                    reason: reason.clone(),
                });
            }
        }
        for link in &self.links {
            let target = link.action.target.clone();
            match link.action.kind {
                LinkActionKind::Conflict if link.applied != LinkApplied::Replaced => {
                    issues.push(ReconcileError::Conflict {
                        target: target.clone(),
                        observed: link.action.observed.clone(),
                    });
                }
                LinkActionKind::BrokenLink if link.applied != LinkApplied::Replaced => {
                    issues.push(ReconcileError::BrokenLink {
                        target: target.clone(),
                    });
                }
                _ => {}
            }
            if let LinkApplied::Failed(reason) = &link.applied {
                issues.push(ReconcileError::LinkFailure {
                    target,
                    reason: reason.clone(),
                });
            }
        }
        issues
    }
}

/// Read-only reconciliation or converging mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Probe and plan only.
    Check,
    /// Install missing packages and create missing links.
    Apply,
    /// Remove links that currently satisfy their mapping.
    Remove,
}

/// Which dimensions of each bundle a run covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Packages, then links.
    #[default]
    Both,
    /// Packages only.
    Packages,
    /// Links only.
    Links,
}

impl Scope {
    /// Whether packages are processed.
    #[must_use]
    pub const fn packages(self) -> bool {
        matches!(self, Self::Both | Self::Packages)
    }

    /// Whether links are processed.
    #[must_use]
    pub const fn links(self) -> bool {
        matches!(self, Self::Both | Self::Links)
    }
}

/// The ordered outcomes of one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Check, Apply, or Remove.
    pub mode: Mode,
    /// Dimensions covered.
    pub scope: Scope,
    /// Whether mutations were elided.
    pub dry_run: bool,
    /// Whether the run stopped early on a cancellation request.
    pub interrupted: bool,
    /// One outcome per processed bundle, in topological order.
    pub outcomes: Vec<BundleOutcome>,
}

impl RunReport {
    /// Find the outcome for `name`.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&BundleOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Number of bundles with `Failed` status.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BundleStatus::Failed(_)))
            .count()
    }

    /// Number of bundles with `Skipped` status.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BundleStatus::Skipped(_)))
            .count()
    }

    /// Returns `true` if every bundle succeeded and the run was not interrupted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.interrupted
            && self
                .outcomes
                .iter()
                .all(|o| o.status == BundleStatus::Succeeded)
    }
}
