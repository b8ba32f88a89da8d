//! Bundle definitions and the registry that holds them.
//!
//! A [`BundleRegistry`] is built once from the loaded configuration and is
//! read-only for the rest of the run.  Declaration order is preserved and is
//! what makes `all` expansion and dependency ordering reproducible.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Name that selects every registered bundle.
pub const ALL_BUNDLES: &str = "all";

/// How a dotfile is placed at its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Target is a symlink to the source.
    #[default]
    Symlink,
    /// Target is a copy of the source (file or directory tree).
    Copy,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => write!(f, "symlink"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// A single source → target mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DotfileMapping {
    /// Absolute path of the source inside the dotfiles repository.
    pub source: PathBuf,
    /// Absolute path where the dotfile should appear.
    pub target: PathBuf,
    /// Symlink or copy.
    pub link_type: LinkType,
}

impl DotfileMapping {
    /// A symlink mapping.
    #[must_use]
    pub fn symlink(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            link_type: LinkType::Symlink,
        }
    }

    /// A copy mapping.
    #[must_use]
    pub fn copy(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            link_type: LinkType::Copy,
        }
    }
}

/// A named unit of machine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Unique bundle name.
    pub name: String,
    /// Bundles that must be reconciled first, in declaration order.
    pub dependencies: Vec<String>,
    /// System packages, in declaration order.
    pub packages: Vec<String>,
    /// Dotfile mappings, in declaration order.
    pub dotfiles: Vec<DotfileMapping>,
}

impl Bundle {
    /// An empty bundle.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            packages: Vec::new(),
            dotfiles: Vec::new(),
        }
    }

    /// Add dependencies, ignoring repeats.
    #[must_use]
    pub fn depends_on(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.dependencies.iter().any(|d| d == name) {
                self.dependencies.push((*name).to_string());
            }
        }
        self
    }

    /// Add packages.
    #[must_use]
    pub fn with_packages(mut self, names: &[&str]) -> Self {
        self.packages.extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Add a dotfile mapping.
    #[must_use]
    pub fn with_dotfile(mut self, mapping: DotfileMapping) -> Self {
        self.dotfiles.push(mapping);
        self
    }
}

/// Immutable, ordered collection of bundles keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BundleRegistry {
    bundles: Vec<Bundle>,
    index: HashMap<String, usize>,
}

impl BundleRegistry {
    /// Build a registry, preserving declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateBundleName`] if two bundles share a
    /// name.  Dangling dependency edges are not checked here; they surface as
    /// [`RegistryError::UnknownBundle`] when the graph is built.
    pub fn load(bundles: Vec<Bundle>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(bundles.len());
        for (i, bundle) in bundles.iter().enumerate() {
            if index.insert(bundle.name.clone(), i).is_some() {
                return Err(RegistryError::DuplicateBundleName(bundle.name.clone()));
            }
        }
        Ok(Self { bundles, index })
    }

    /// Expand requested names into concrete bundle names.
    ///
    /// Empty input, or any occurrence of `all`, selects every bundle in
    /// declaration order.  Other names are validated even then.  Repeated
    /// names keep their first position.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBundle`] for the first unregistered name.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>, RegistryError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        let mut all = names.is_empty();
        for name in names {
            let name = name.as_ref();
            if name == ALL_BUNDLES {
                all = true;
                continue;
            }
            self.lookup(name)?;
            if seen.insert(name) {
                resolved.push(name.to_string());
            }
        }
        if all {
            return Ok(self.names().map(str::to_string).collect());
        }
        Ok(resolved)
    }

    /// Find a bundle by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBundle`] if no such bundle is registered.
    pub fn lookup(&self, name: &str) -> Result<&Bundle, RegistryError> {
        self.index
            .get(name)
            .and_then(|&i| self.bundles.get(i))
            .ok_or_else(|| RegistryError::UnknownBundle(name.to_string()))
    }

    /// Bundle names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.iter().map(|b| b.name.as_str())
    }

    /// Bundles in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Bundle> {
        self.bundles.iter()
    }

    /// Number of registered bundles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Returns `true` if no bundles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

impl<'a> IntoIterator for &'a BundleRegistry {
    type Item = &'a Bundle;
    type IntoIter = std::slice::Iter<'a, Bundle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
