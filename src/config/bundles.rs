//! `[[bundle]]` table parsing and path resolution.
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use super::expand::Expander;
use crate::error::ConfigError;
use crate::registry::{Bundle, DotfileMapping, LinkType};
use crate::resources::PackageManager;

/// A single `[[bundle]]` table as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleSection {
    /// Unique bundle name.
    pub name: String,
    /// Names of bundles this one depends on.
    #[serde(default)]
    pub depends: Vec<String>,
    /// System packages.
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
    /// Directory under the dotfiles root holding this bundle's sources;
    /// defaults to the bundle name.
    #[serde(default)]
    pub root: Option<String>,
    /// Dotfile entries.
    #[serde(default)]
    pub dotfiles: Vec<DotfileEntry>,
}

/// A single entry in a `packages` list: a plain name, or a
/// `{ name, manager }` table routing the package to a specific manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PackageEntry {
    /// Installed with the default manager.
    Simple(String),
    /// Installed with `manager`.
    Routed {
        /// Package name.
        name: String,
        /// Manager name, e.g. `paru` for AUR packages.
        manager: String,
    },
}

impl PackageEntry {
    /// Package name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Simple(name) | Self::Routed { name, .. } => name,
        }
    }
}

/// A single entry in a `dotfiles` list: either a plain source path or a
/// structured `{ source, target, type }` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DotfileEntry {
    /// Plain string: `"gitconfig"` links to `~/.gitconfig`.
    Simple(String),
    /// Structured entry with an explicit target and/or link type.
    Detailed {
        /// Source path relative to the bundle root.
        source: String,
        /// Target path; derived from the source when absent.
        #[serde(default)]
        target: Option<String>,
        /// Symlink (default) or copy.
        #[serde(default, rename = "type")]
        link_type: LinkType,
    },
}

impl DotfileEntry {
    /// Source path as written.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Simple(source) | Self::Detailed { source, .. } => source,
        }
    }
}

impl BundleSection {
    /// Directory holding this bundle's sources.
    #[must_use]
    pub fn root_dir(&self, dotfiles_dir: &Path) -> PathBuf {
        dotfiles_dir.join(self.root.as_deref().unwrap_or(&self.name))
    }

    /// Packages that name their own manager.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPackageManager`] for an unrecognised
    /// manager name.
    pub fn package_overrides(&self) -> Result<Vec<(String, PackageManager)>, ConfigError> {
        self.packages
            .iter()
            .filter_map(|entry| match entry {
                PackageEntry::Simple(_) => None,
                PackageEntry::Routed { name, manager } => Some((name, manager)),
            })
            .map(|(name, manager)| {
                manager
                    .parse::<PackageManager>()
                    .map(|m| (name.clone(), m))
            })
            .collect()
    }

    /// Convert into a [`Bundle`] with absolute source and target paths.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source escapes the bundle root, a target
    /// cannot be expanded, or a target is not absolute after expansion.
    pub fn into_bundle(self, dotfiles_dir: &Path, expander: &Expander) -> Result<Bundle, ConfigError> {
        let root = self.root_dir(dotfiles_dir);
        let mut dotfiles = Vec::with_capacity(self.dotfiles.len());

        for entry in &self.dotfiles {
            let (source, target, link_type) = match entry {
                DotfileEntry::Simple(source) => (source, None, LinkType::Symlink),
                DotfileEntry::Detailed {
                    source,
                    target,
                    link_type,
                } => (source, target.as_deref(), *link_type),
            };
            validate_source(&self.name, source)?;

            let raw_target = target.map_or_else(|| default_target(source), str::to_string);
            let expanded = expander.expand(&self.name, &raw_target)?;
            if !expanded.is_absolute() {
                return Err(ConfigError::RelativeTarget {
                    bundle: self.name.clone(),
                    target: expanded.display().to_string(),
                });
            }

            dotfiles.push(DotfileMapping {
                source: root.join(source),
                target: expanded,
                link_type,
            });
        }

        Ok(Bundle {
            name: self.name,
            dependencies: dedup(self.depends),
            packages: self
                .packages
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            dotfiles,
        })
    }
}

/// `"config/nvim"` → `"~/.config/nvim"`.
fn default_target(source: &str) -> String {
    format!("~/.{}", source.trim_start_matches('.'))
}

fn validate_source(bundle: &str, source: &str) -> Result<(), ConfigError> {
    let path = Path::new(source);
    let escapes = source.is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir));
    if escapes {
        return Err(ConfigError::InvalidSource {
            bundle: bundle.to_string(),
            source_path: source.to_string(),
        });
    }
    Ok(())
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
