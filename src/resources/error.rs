//! Typed error variants for resource operations.
//!
//! [`ResourceError`] covers failures of the production backends: a package
//! manager command that exits non-zero, a query whose output cannot be
//! understood, or a backend that is not installed.  The engine never sees
//! these directly; backends fold them into probe/installer results.

use thiserror::Error;

/// Errors that arise from package probes and command execution.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command invoked by a backend failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// The package manager binary is not on `PATH`.
    #[error("package manager '{program}' is not available")]
    BackendUnavailable {
        /// Program that was looked up.
        program: String,
    },

    /// No supported package manager was configured or detected.
    #[error("no supported package manager found for this machine")]
    NoPackageManager,

    /// The installed-package query could not be answered.
    #[error("cannot query installed packages via {program}: {reason}")]
    ProbeUnavailable {
        /// Program that was queried.
        program: String,
        /// Why the query failed.
        reason: String,
    },
}
