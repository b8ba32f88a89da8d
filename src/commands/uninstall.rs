//! Command: remove the dotfiles the selected bundles placed.
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::CommandSetup;
use crate::cli::{BundleArgs, GlobalOpts};
use crate::engine::RunOptions;
use crate::logging::Logger;

/// Remove every link or copy that still matches its mapping.
///
/// Packages are never uninstalled.  Targets that do not match are left alone.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the bundle set is
/// structurally invalid, or any removal fails.
pub fn run(
    global: &GlobalOpts,
    args: &BundleArgs,
    log: &Arc<Logger>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.engine_context(Arc::clone(log) as _, Arc::clone(cancel));

    if global.dry_run {
        log.warn("dry run: no changes will be made");
    }
    log.stage("Removing dotfiles");
    let options = RunOptions::remove().with_dry_run(global.dry_run);
    super::run_to_completion(&setup, &ctx, &args.bundles, options, global, log)?;
    Ok(())
}
