//! Command: report drift without changing anything.
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::CommandSetup;
use crate::cli::{BundleArgs, GlobalOpts};
use crate::engine::{RunOptions, Scope};
use crate::logging::Logger;

/// Run a read-only check over `scope` of the selected bundles.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any bundle is not
/// fully converged.
pub fn run(
    global: &GlobalOpts,
    args: &BundleArgs,
    scope: Scope,
    log: &Arc<Logger>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.engine_context(Arc::clone(log) as _, Arc::clone(cancel));

    log.stage("Checking bundles");
    super::run_to_completion(
        &setup,
        &ctx,
        &args.bundles,
        RunOptions::check(scope),
        global,
        log,
    )?;
    Ok(())
}
