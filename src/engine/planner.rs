//! Link planning: diff desired dotfile mappings against the filesystem.
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::registry::{Bundle, DotfileMapping, LinkType};
use crate::resources::symlink::paths_equal;
use crate::resources::{ContentHash, FileSystemProbe, Observation};

/// What a mapping wants its target to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesiredState {
    /// A symlink pointing at `source`.
    SymlinkTo {
        /// Link destination.
        source: PathBuf,
    },
    /// A copy whose content digest matches the source.
    CopyOf {
        /// Copy origin.
        source: PathBuf,
        /// Digest of the source, `None` if the source is missing.
        digest: Option<ContentHash>,
    },
}

/// Classification of a single mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkActionKind {
    /// Target is absent and can be created.
    Create,
    /// Target already matches.
    AlreadySatisfied,
    /// Target is occupied by something else.
    Conflict,
    /// Target is a dangling symlink that does not match.
    BrokenLink,
}

/// Planned step for one dotfile mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkAction {
    /// Absolute source path.
    pub source: PathBuf,
    /// Absolute target path.
    pub target: PathBuf,
    /// Symlink or copy.
    pub link_type: LinkType,
    /// Desired target state.
    pub desired: DesiredState,
    /// Observed target state.
    pub observed: Observation,
    /// Classification.
    pub kind: LinkActionKind,
}

/// Classifies dotfile mappings against a [`FileSystemProbe`].
///
/// Planning never mutates anything.
#[derive(Debug, Clone, Copy)]
pub struct LinkPlanner<'a> {
    fs: &'a dyn FileSystemProbe,
}

impl<'a> LinkPlanner<'a> {
    /// Create a planner over `fs`.
    #[must_use]
    pub const fn new(fs: &'a dyn FileSystemProbe) -> Self {
        Self { fs }
    }

    /// Plan every mapping of `bundle`, in declaration order.
    #[must_use]
    pub fn plan(&self, bundle: &Bundle) -> Vec<LinkAction> {
        bundle.dotfiles.iter().map(|m| self.classify(m)).collect()
    }

    /// Classify a single mapping.
    #[must_use]
    pub fn classify(&self, mapping: &DotfileMapping) -> LinkAction {
        let observed = self.fs.observe(&mapping.target);
        let (desired, kind) = match mapping.link_type {
            LinkType::Symlink => (
                DesiredState::SymlinkTo {
                    source: mapping.source.clone(),
                },
                self.classify_symlink(mapping, &observed),
            ),
            LinkType::Copy => {
                let digest = self.fs.digest(&mapping.source);
                let kind = self.classify_copy(mapping, &observed, digest.as_ref());
                (
                    DesiredState::CopyOf {
                        source: mapping.source.clone(),
                        digest,
                    },
                    kind,
                )
            }
        };

        LinkAction {
            source: mapping.source.clone(),
            target: mapping.target.clone(),
            link_type: mapping.link_type,
            desired,
            observed,
            kind,
        }
    }

    fn classify_symlink(&self, mapping: &DotfileMapping, observed: &Observation) -> LinkActionKind {
        match observed {
            Observation::Absent => LinkActionKind::Create,
            Observation::SymlinkTo(contents) => {
                let resolved = resolve_link(&mapping.target, contents);
                if paths_equal(&resolved, &normalize(&mapping.source)) {
                    LinkActionKind::AlreadySatisfied
                } else {
                    self.live_or_broken(&mapping.target)
                }
            }
            Observation::RegularFile(_) | Observation::Directory | Observation::Unreadable(_) => {
                LinkActionKind::Conflict
            }
        }
    }

    fn classify_copy(
        &self,
        mapping: &DotfileMapping,
        observed: &Observation,
        source_digest: Option<&ContentHash>,
    ) -> LinkActionKind {
        match observed {
            Observation::Absent => LinkActionKind::Create,
            Observation::RegularFile(hash) if source_digest == Some(hash) => {
                LinkActionKind::AlreadySatisfied
            }
            Observation::Directory
                if source_digest.is_some()
                    && self.fs.digest(&mapping.target).as_ref() == source_digest =>
            {
                LinkActionKind::AlreadySatisfied
            }
            Observation::SymlinkTo(_) => self.live_or_broken(&mapping.target),
            Observation::RegularFile(_) | Observation::Directory | Observation::Unreadable(_) => {
                LinkActionKind::Conflict
            }
        }
    }

    fn live_or_broken(&self, target: &Path) -> LinkActionKind {
        if self.fs.exists(target) {
            LinkActionKind::Conflict
        } else {
            LinkActionKind::BrokenLink
        }
    }
}

/// Resolve raw symlink contents against the link's parent directory.
fn resolve_link(link: &Path, contents: &Path) -> PathBuf {
    if contents.is_absolute() {
        return normalize(contents);
    }
    let base = link.parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(contents))
}

/// Lexically remove `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
