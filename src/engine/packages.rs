//! Package step of a bundle.
use std::collections::HashSet;

use super::context::EngineContext;
use super::outcome::{PackageApplied, PackageResult, PackageState};
use crate::registry::Bundle;
use crate::resources::InstallResult;

fn probe(ctx: &EngineContext, name: &str) -> PackageState {
    match ctx.packages.is_installed(name) {
        Ok(true) => PackageState::Present,
        Ok(false) => PackageState::Missing,
        Err(e) => {
            ctx.log.warn(&format!("cannot determine state of {name}: {e}"));
            PackageState::Unknown(e.to_string())
        }
    }
}

/// Probe every package without installing anything.
pub(super) fn check(ctx: &EngineContext, bundle: &Bundle) -> Vec<PackageResult> {
    bundle
        .packages
        .iter()
        .map(|name| {
            let observed = probe(ctx, name);
            let applied = if observed == PackageState::Present {
                PackageApplied::Unchanged
            } else {
                PackageApplied::NotAttempted
            };
            ctx.log.debug(&format!("package {name}: {observed:?}"));
            PackageResult {
                package: name.clone(),
                observed,
                applied,
            }
        })
        .collect()
}

/// Packages a dry run has already reported as installed.
///
/// Later bundles in the same run see these as present, as they would after a
/// real install.
#[derive(Debug, Default)]
pub(super) struct Staged(HashSet<String>);

impl Staged {
    fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    fn insert(&mut self, name: &str) {
        self.0.insert(name.to_string());
    }
}

/// Install every missing package.  Unknown packages are left alone.
pub(super) fn apply(
    ctx: &EngineContext,
    bundle: &Bundle,
    dry_run: bool,
    staged: &mut Staged,
) -> Vec<PackageResult> {
    bundle
        .packages
        .iter()
        .map(|name| {
            let observed = if dry_run && staged.contains(name) {
                PackageState::Present
            } else {
                probe(ctx, name)
            };
            let applied = match &observed {
                PackageState::Present => {
                    ctx.log.debug(&format!("{name} already installed"));
                    PackageApplied::Unchanged
                }
                PackageState::Unknown(_) => PackageApplied::NotAttempted,
                PackageState::Missing if dry_run => {
                    ctx.log.dry_run(&format!("would install {name}"));
                    staged.insert(name);
                    PackageApplied::Installed
                }
                PackageState::Missing => match ctx.installer.install(name) {
                    InstallResult::Success => {
                        ctx.log.info(&format!("installed {name}"));
                        PackageApplied::Installed
                    }
                    InstallResult::Failure(reason) => {
                        ctx.log.error(&format!("failed to install {name}: {reason}"));
                        PackageApplied::Failed(reason)
                    }
                },
            };
            PackageResult {
                package: name.clone(),
                observed,
                applied,
            }
        })
        .collect()
}
