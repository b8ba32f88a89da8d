//! Link step of a bundle.
use super::context::EngineContext;
use super::outcome::{LinkApplied, LinkResult};
use super::planner::{LinkAction, LinkActionKind};
use crate::registry::LinkType;
use crate::resources::Observation;

/// Wrap planned actions without mutating anything.
pub(super) fn check(ctx: &EngineContext, actions: Vec<LinkAction>) -> Vec<LinkResult> {
    actions
        .into_iter()
        .map(|action| {
            ctx.log.debug(&format!(
                "{} -> {}: {:?}",
                action.target.display(),
                action.source.display(),
                action.kind
            ));
            let applied = if action.kind == LinkActionKind::AlreadySatisfied {
                LinkApplied::Unchanged
            } else {
                LinkApplied::NotAttempted
            };
            LinkResult { action, applied }
        })
        .collect()
}

/// Record planned actions as not attempted because an earlier step failed.
pub(super) fn blocked(actions: Vec<LinkAction>) -> Vec<LinkResult> {
    actions
        .into_iter()
        .map(|action| LinkResult {
            applied: if action.kind == LinkActionKind::AlreadySatisfied {
                LinkApplied::Unchanged
            } else {
                LinkApplied::NotAttempted
            },
            action,
        })
        .collect()
}

/// Carry out planned actions.
///
/// Conflicts and broken links are refused unless `force` is set, and even
/// then only symlinks and regular files are replaced.
pub(super) fn apply(
    ctx: &EngineContext,
    actions: Vec<LinkAction>,
    dry_run: bool,
    force: bool,
) -> Vec<LinkResult> {
    actions
        .into_iter()
        .map(|action| {
            let applied = match action.kind {
                LinkActionKind::AlreadySatisfied => LinkApplied::Unchanged,
                LinkActionKind::Create => create(ctx, &action, dry_run),
                LinkActionKind::Conflict | LinkActionKind::BrokenLink => {
                    replace(ctx, &action, dry_run, force)
                }
            };
            LinkResult { action, applied }
        })
        .collect()
}

/// Remove targets that currently satisfy their mapping.
///
/// Anything else at a target is left alone.  Copied directory trees are
/// refused.
pub(super) fn remove(
    ctx: &EngineContext,
    actions: Vec<LinkAction>,
    dry_run: bool,
) -> Vec<LinkResult> {
    actions
        .into_iter()
        .map(|action| {
            let target = action.target.display();
            let applied = if action.kind != LinkActionKind::AlreadySatisfied {
                ctx.log
                    .debug(&format!("{target}: not placed by this mapping, leaving it"));
                LinkApplied::Unchanged
            } else if action.observed == Observation::Directory {
                ctx.log
                    .warn(&format!("{target}: copied directory, not removing"));
                LinkApplied::Refused("copied directory".to_string())
            } else if dry_run {
                ctx.log.dry_run(&format!("would remove {target}"));
                LinkApplied::Removed
            } else {
                match ctx.linker.remove(&action.target) {
                    Ok(()) => {
                        ctx.log.info(&format!("removed {target}"));
                        LinkApplied::Removed
                    }
                    Err(e) => {
                        ctx.log.error(&format!("{target}: {e:#}"));
                        LinkApplied::Failed(format!("{e:#}"))
                    }
                }
            };
            LinkResult { action, applied }
        })
        .collect()
}

fn create(ctx: &EngineContext, action: &LinkAction, dry_run: bool) -> LinkApplied {
    if let Some(failed) = missing_source(ctx, action) {
        return failed;
    }
    if dry_run {
        ctx.log.dry_run(&format!("would {}", describe(action)));
        return LinkApplied::Created;
    }
    match place(ctx, action) {
        Ok(()) => {
            ctx.log.info(&describe(action));
            LinkApplied::Created
        }
        Err(e) => {
            ctx.log
                .error(&format!("{}: {e:#}", action.target.display()));
            LinkApplied::Failed(format!("{e:#}"))
        }
    }
}

fn replace(ctx: &EngineContext, action: &LinkAction, dry_run: bool, force: bool) -> LinkApplied {
    let reason = refusal(action);
    if !force {
        ctx.log.warn(&format!(
            "{}: {reason} (use --force to replace)",
            action.target.display()
        ));
        return LinkApplied::Refused(reason);
    }
    if !matches!(
        action.observed,
        Observation::SymlinkTo(_) | Observation::RegularFile(_)
    ) {
        ctx.log.warn(&format!(
            "{}: {reason}, not replacing",
            action.target.display()
        ));
        return LinkApplied::Refused(reason);
    }
    if let Some(failed) = missing_source(ctx, action) {
        return failed;
    }
    if dry_run {
        ctx.log.dry_run(&format!(
            "would replace {} and {}",
            action.observed,
            describe(action)
        ));
        return LinkApplied::Replaced;
    }

    let result = ctx
        .linker
        .remove(&action.target)
        .and_then(|()| place(ctx, action));
    match result {
        Ok(()) => {
            ctx.log.info(&format!("replaced {}", action.target.display()));
            LinkApplied::Replaced
        }
        Err(e) => {
            ctx.log
                .error(&format!("{}: {e:#}", action.target.display()));
            LinkApplied::Failed(format!("{e:#}"))
        }
    }
}

/// A source that is gone fails the mapping in real and dry runs alike.
fn missing_source(ctx: &EngineContext, action: &LinkAction) -> Option<LinkApplied> {
    if ctx.fs.exists(&action.source) {
        return None;
    }
    let reason = format!("source does not exist: {}", action.source.display());
    ctx.log
        .error(&format!("{}: {reason}", action.target.display()));
    Some(LinkApplied::Failed(reason))
}

fn place(ctx: &EngineContext, action: &LinkAction) -> anyhow::Result<()> {
    match action.link_type {
        LinkType::Symlink => ctx.linker.create_symlink(&action.source, &action.target),
        LinkType::Copy => ctx.linker.copy(&action.source, &action.target),
    }
}

fn describe(action: &LinkAction) -> String {
    let verb = match action.link_type {
        LinkType::Symlink => "link",
        LinkType::Copy => "copy",
    };
    format!(
        "{verb} {} -> {}",
        action.target.display(),
        action.source.display()
    )
}

fn refusal(action: &LinkAction) -> String {
    match action.kind {
        LinkActionKind::BrokenLink => format!("dangling link ({})", action.observed),
        _ => format!("occupied by {}", action.observed),
    }
}
