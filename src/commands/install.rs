//! Command: converge the selected bundles.
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::CommandSetup;
use crate::cli::{BundleArgs, GlobalOpts};
use crate::engine::{RunOptions, Scope};
use crate::logging::Logger;

/// Install missing packages and create missing links over `scope`.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the bundle set is
/// structurally invalid, or any bundle fails or is skipped.
pub fn run(
    global: &GlobalOpts,
    args: &BundleArgs,
    scope: Scope,
    log: &Arc<Logger>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    let version = option_env!("DOTS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("dots {version}"));

    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.engine_context(Arc::clone(log) as _, Arc::clone(cancel));

    if global.dry_run {
        log.warn("dry run: no changes will be made");
    }
    log.stage("Reconciling bundles");
    let options = RunOptions::apply(scope)
        .with_dry_run(global.dry_run)
        .with_force(global.force);
    super::run_to_completion(&setup, &ctx, &args.bundles, options, global, log)?;
    Ok(())
}
