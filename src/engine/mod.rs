//! Bundle reconciliation engine.
//!
//! A run resolves the requested bundles, orders them so that every bundle
//! follows its dependencies, and then walks that order one bundle at a time:
//! packages first, then dotfile links.  When applying, a bundle whose
//! dependency failed or was skipped is itself skipped without being probed.
//!
//! Removal walks the order backwards so dependents are unlinked first, and
//! never skips.
//!
//! Structural defects (unknown bundles, cycles, duplicate targets) abort the
//! run before anything is probed.  Everything else is recorded in the
//! returned [`RunReport`].
pub mod context;
pub mod graph;
mod links;
pub mod outcome;
mod packages;
pub mod planner;

use std::collections::HashMap;
use std::path::PathBuf;

pub use context::EngineContext;
pub use graph::DependencyGraph;
pub use outcome::{
    BundleOutcome, BundleStatus, LinkApplied, LinkResult, Mode, PackageApplied, PackageResult,
    PackageState, RunReport, Scope,
};
pub use planner::{DesiredState, LinkAction, LinkActionKind, LinkPlanner};

use crate::error::RegistryError;
use crate::registry::{Bundle, BundleRegistry};

/// Parameters of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Check, Apply, or Remove.
    pub mode: Mode,
    /// Dimensions to cover.
    pub scope: Scope,
    /// Log intended mutations instead of performing them.
    pub dry_run: bool,
    /// Replace conflicting symlinks and regular files.
    pub force: bool,
}

impl RunOptions {
    /// Read-only run over `scope`.
    #[must_use]
    pub const fn check(scope: Scope) -> Self {
        Self {
            mode: Mode::Check,
            scope,
            dry_run: false,
            force: false,
        }
    }

    /// Converging run over `scope`.
    #[must_use]
    pub const fn apply(scope: Scope) -> Self {
        Self {
            mode: Mode::Apply,
            scope,
            dry_run: false,
            force: false,
        }
    }

    /// Unlinking run.  Packages are never removed.
    #[must_use]
    pub const fn remove() -> Self {
        Self {
            mode: Mode::Remove,
            scope: Scope::Links,
            dry_run: false,
            force: false,
        }
    }

    /// Set dry-run.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set force.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Drives reconciliation of a [`BundleRegistry`] through an [`EngineContext`].
#[derive(Debug)]
pub struct Engine<'a> {
    registry: &'a BundleRegistry,
    graph: DependencyGraph,
    ctx: &'a EngineContext,
}

impl<'a> Engine<'a> {
    /// Create an engine over `registry`.
    #[must_use]
    pub fn new(registry: &'a BundleRegistry, ctx: &'a EngineContext) -> Self {
        Self {
            registry,
            graph: DependencyGraph::new(registry),
            ctx,
        }
    }

    /// The dependency graph of the registry.
    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resolve `requested` and return the processing order.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] for unknown bundles, dependency cycles, or
    /// two selected bundles claiming the same target.
    pub fn order<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>, RegistryError> {
        let selected = self.registry.resolve(requested)?;
        let order = self.graph.topological_order(&selected)?;
        self.check_targets(&order)?;
        Ok(order)
    }

    fn check_targets(&self, order: &[String]) -> Result<(), RegistryError> {
        let mut claimed: HashMap<&PathBuf, &str> = HashMap::new();
        for bundle in order.iter().filter_map(|n| self.registry.lookup(n).ok()) {
            for mapping in &bundle.dotfiles {
                if let Some(first) = claimed.insert(&mapping.target, &bundle.name) {
                    return Err(RegistryError::DuplicateTarget {
                        target: mapping.target.clone(),
                        first: first.to_string(),
                        second: bundle.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reconcile `requested` (empty or `all` selects every bundle).
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the selection is structurally invalid.
    /// Nothing has been probed or mutated in that case.
    pub fn run<S: AsRef<str>>(
        &self,
        requested: &[S],
        options: RunOptions,
    ) -> Result<RunReport, RegistryError> {
        let mut order = self.order(requested)?;
        if options.mode == Mode::Remove {
            order.reverse();
        }
        tracing::debug!(?order, ?options, "reconciliation order");

        let mut report = RunReport {
            mode: options.mode,
            scope: options.scope,
            dry_run: options.dry_run,
            interrupted: false,
            outcomes: Vec::with_capacity(order.len()),
        };
        let mut statuses: HashMap<&str, BundleStatus> = HashMap::new();
        let mut staged = packages::Staged::default();

        for name in &order {
            if self.ctx.is_cancelled() {
                self.ctx
                    .log
                    .warn(&format!("interrupted, stopping before '{name}'"));
                report.interrupted = true;
                break;
            }
            let bundle = self.registry.lookup(name)?;

            let blocked = match options.mode {
                Mode::Apply => blocking_dependency(
                    self.graph.dependencies_of(name).unwrap_or_default(),
                    &statuses,
                ),
                Mode::Check | Mode::Remove => None,
            };
            let outcome = match blocked {
                Some(reason) => {
                    self.ctx.log.warn(&format!("skipping {name}: {reason}"));
                    let mut outcome = BundleOutcome::new(name.as_str());
                    outcome.status = BundleStatus::Skipped(reason);
                    outcome
                }
                None => self.reconcile(bundle, options, &mut staged),
            };
            if options.mode == Mode::Apply && outcome.status.blocks_dependents() {
                let dependents: Vec<&str> = self
                    .graph
                    .dependents_of(name)
                    .into_iter()
                    .filter(|d| order.iter().any(|o| o == d))
                    .collect();
                if !dependents.is_empty() {
                    self.ctx.log.warn(&format!(
                        "{name} did not succeed; skipping {}",
                        dependents.join(", ")
                    ));
                }
            }
            statuses.insert(name.as_str(), outcome.status.clone());
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    fn reconcile(
        &self,
        bundle: &Bundle,
        options: RunOptions,
        staged: &mut packages::Staged,
    ) -> BundleOutcome {
        self.ctx.log.stage(&bundle.name);
        let mut outcome = BundleOutcome::new(bundle.name.as_str());

        if options.scope.packages() {
            outcome.packages = match options.mode {
                Mode::Check => packages::check(self.ctx, bundle),
                Mode::Apply => packages::apply(self.ctx, bundle, options.dry_run, staged),
                Mode::Remove => Vec::new(),
            };
        }

        if options.scope.links() {
            let actions = LinkPlanner::new(self.ctx.fs.as_ref()).plan(bundle);
            let install_failed = outcome
                .packages
                .iter()
                .any(|p| matches!(p.applied, PackageApplied::Failed(_)));
            outcome.links = match options.mode {
                Mode::Check => links::check(self.ctx, actions),
                Mode::Apply if install_failed => links::blocked(actions),
                Mode::Apply => links::apply(self.ctx, actions, options.dry_run, options.force),
                Mode::Remove => links::remove(self.ctx, actions, options.dry_run),
            };
        }

        outcome.status = settle(&outcome, options.mode);
        self.ctx
            .log
            .debug(&format!("{}: {}", bundle.name, outcome.status));
        outcome
    }
}

/// The first failed or skipped entry of `dependencies`, as a skip reason.
fn blocking_dependency(
    dependencies: &[String],
    statuses: &HashMap<&str, BundleStatus>,
) -> Option<String> {
    dependencies
        .iter()
        .find_map(|dep| match statuses.get(dep.as_str()) {
            Some(BundleStatus::Failed(_)) => Some(format!("dependency '{dep}' failed")),
            Some(BundleStatus::Skipped(_)) => Some(format!("dependency '{dep}' was skipped")),
            _ => None,
        })
}

/// Derive the final status of a processed bundle from its item results.
fn settle(outcome: &BundleOutcome, mode: Mode) -> BundleStatus {
    let problems = match mode {
        Mode::Check => check_deficiencies(outcome),
        Mode::Apply | Mode::Remove => apply_failures(outcome),
    };
    if problems.is_empty() {
        BundleStatus::Succeeded
    } else {
        BundleStatus::Failed(problems.join("; "))
    }
}

fn check_deficiencies(outcome: &BundleOutcome) -> Vec<String> {
    let mut problems = Vec::new();
    for pkg in &outcome.packages {
        match &pkg.observed {
            PackageState::Present => {}
            PackageState::Missing => problems.push(format!("package {} missing", pkg.package)),
            PackageState::Unknown(reason) => {
                problems.push(format!("package {} unknown: {reason}", pkg.package));
            }
        }
    }
    for link in &outcome.links {
        let target = link.action.target.display();
        match link.action.kind {
            LinkActionKind::AlreadySatisfied => {}
            LinkActionKind::Create => problems.push(format!("{target} missing")),
            LinkActionKind::Conflict => {
                problems.push(format!("{target} occupied by {}", link.action.observed));
            }
            LinkActionKind::BrokenLink => problems.push(format!("{target} is a broken link")),
        }
    }
    problems
}

fn apply_failures(outcome: &BundleOutcome) -> Vec<String> {
    let mut problems = Vec::new();
    for pkg in &outcome.packages {
        if let PackageApplied::Failed(reason) = &pkg.applied {
            problems.push(format!("install {} failed: {reason}", pkg.package));
        }
    }
    for link in &outcome.links {
        let target = link.action.target.display();
        match &link.applied {
            LinkApplied::Refused(reason) => problems.push(format!("{target} {reason}")),
            LinkApplied::Failed(reason) => problems.push(format!("{target}: {reason}")),
            _ => {}
        }
    }
    problems
}

/// Shared helpers for engine unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::sync::{Arc, Mutex};

    use super::EngineContext;
    use crate::logging::{Log, SummaryStatus};
    use crate::resources::test_helpers::MemoryWorld;

    /// A [`Log`] that keeps every message in memory.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        messages: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingLog {
        /// Messages logged at `level`, in order.
        #[must_use]
        pub fn at(&self, level: &str) -> Vec<String> {
            self.messages
                .lock()
                .map(|m| {
                    m.iter()
                        .filter(|(l, _)| *l == level)
                        .map(|(_, msg)| msg.clone())
                        .collect()
                })
                .unwrap_or_default()
        }

        fn push(&self, level: &'static str, msg: &str) {
            if let Ok(mut m) = self.messages.lock() {
                m.push((level, msg.to_string()));
            }
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }
        fn info(&self, msg: &str) {
            self.push("info", msg);
        }
        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }
        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }
        fn error(&self, msg: &str) {
            self.push("error", msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }
        fn record_bundle(&self, name: &str, _status: SummaryStatus, _message: Option<&str>) {
            self.push("bundle", name);
        }
    }

    /// Context whose every collaborator is `world`.
    #[must_use]
    pub fn memory_context(world: &Arc<MemoryWorld>) -> EngineContext {
        memory_context_with_log(world, Arc::new(RecordingLog::default()))
    }

    /// Context over `world` that logs to `log`.
    #[must_use]
    pub fn memory_context_with_log(world: &Arc<MemoryWorld>, log: Arc<dyn Log>) -> EngineContext {
        EngineContext::new(
            Arc::clone(world) as _,
            Arc::clone(world) as _,
            Arc::clone(world) as _,
            Arc::clone(world) as _,
            log,
        )
    }
}
