//! Domain-specific error types for the dots engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`RegistryError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotsError
//! ├── Config(ConfigError)      — TOML parsing, path expansion, bad values
//! ├── Registry(RegistryError)  — structural defects: unknown/duplicate bundles, cycles
//! └── Resource(ResourceError)  — probe and command failures
//! ```
//!
//! [`ReconcileError`] is not part of the hierarchy: runtime conditions never
//! abort a run, they are recorded per bundle in the engine's report and can
//! be recovered as typed values via
//! [`BundleOutcome::issues`](crate::engine::BundleOutcome::issues).

use std::path::PathBuf;

use thiserror::Error;

use crate::resources::error::ResourceError;
use crate::resources::fs::Observation;

/// Top-level error type for the dots engine.
#[derive(Error, Debug)]
pub enum DotsError {
    /// Configuration-related error (parsing, expansion, I/O).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Structural defect in the bundle set; aborts the run before any probing.
    #[error("Bundle error: {0}")]
    Registry(#[from] RegistryError),

    /// Resource operation error (probe, command execution).
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

/// Errors that arise from loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// The file is not valid TOML or does not match the expected schema.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// File that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A `~` or `$VAR` reference could not be expanded.
    #[error("cannot expand '{value}' in bundle '{bundle}': {message}")]
    Expansion {
        /// Bundle the value belongs to (or `settings`).
        bundle: String,
        /// The raw value as written.
        value: String,
        /// Why expansion failed.
        message: String,
    },

    /// A dotfile target is not absolute after expansion.
    #[error("target '{target}' in bundle '{bundle}' must be an absolute path")]
    RelativeTarget {
        /// Bundle declaring the mapping.
        bundle: String,
        /// Target as expanded.
        target: String,
    },

    /// A dotfile source escapes the bundle root or is absolute.
    #[error("source '{source_path}' in bundle '{bundle}' must be relative to the bundle root")]
    InvalidSource {
        /// Bundle declaring the mapping.
        bundle: String,
        /// Source as written.
        source_path: String,
    },

    /// The configured package manager is not one we know how to drive.
    #[error("unknown package manager '{0}': expected one of pacman, paru, yay, apt, brew, winget")]
    UnknownPackageManager(String),

    /// Two bundles route the same package to different managers.
    #[error("package '{package}' is assigned to both {first} and {second}")]
    ConflictingManager {
        /// Package name.
        package: String,
        /// Manager named first.
        first: String,
        /// Manager named later.
        second: String,
    },
}

/// Structural defects of the bundle set.
///
/// Any of these aborts the entire run before probing or mutation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A requested bundle or a dependency edge names a bundle that is not registered.
    #[error("unknown bundle '{0}'")]
    UnknownBundle(String),

    /// Two bundles were declared with the same name.
    #[error("bundle '{0}' is declared more than once")]
    DuplicateBundleName(String),

    /// The dependency graph contains a cycle; the path starts and ends on the same bundle.
    #[error("dependency cycle detected: {}", .0.join(" → "))]
    CyclicDependency(Vec<String>),

    /// Two selected bundles map dotfiles onto the same target.
    #[error("target {} is claimed by both '{first}' and '{second}'", .target.display())]
    DuplicateTarget {
        /// The contested target path.
        target: PathBuf,
        /// Bundle that declared the target first (in run order).
        first: String,
        /// Bundle that declared it again.
        second: String,
    },
}

/// Runtime conditions recorded in a bundle outcome.
///
/// These are recovered locally by the engine; they never abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Target is occupied by something other than the desired link.
    #[error("conflict at {}: found {observed}", .target.display())]
    Conflict {
        /// Target path.
        target: PathBuf,
        /// What currently occupies the target.
        observed: Observation,
    },

    /// Target is a dangling symlink that does not point at the source.
    #[error("broken link at {}", .target.display())]
    BrokenLink {
        /// Target path.
        target: PathBuf,
    },

    /// A probe could not answer; the resource's state is unknown.
    #[error("probe unavailable for {resource}: {reason}")]
    ProbeUnavailable {
        /// Package (or path) that could not be probed.
        resource: String,
        /// Why the probe failed.
        reason: String,
    },

    /// The installer reported failure.
    #[error("failed to install {package}: {reason}")]
    InstallFailure {
        /// Package name.
        package: String,
        /// Installer message.
        reason: String,
    },

    /// Creating a link or copy failed.
    #[error("failed to link {}: {reason}", .target.display())]
    LinkFailure {
        /// Target path.
        target: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The bundle was not attempted because an upstream bundle did not succeed.
    #[error("skipped {bundle}: {upstream}")]
    Skipped {
        /// Skipped bundle.
        bundle: String,
        /// Reason naming the upstream bundle.
        upstream: String,
    },
}
