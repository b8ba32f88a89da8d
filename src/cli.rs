use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "dots",
    about = "Reconcile packages and dotfiles from declarative bundles",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Path to the bundle configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "DOTS_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Replace conflicting symlinks and files (never directories)
    #[arg(long, global = true)]
    pub force: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,
}

/// Bundle selection shared by reconciling subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct BundleArgs {
    /// Bundles to process (default: all)
    #[arg(value_name = "BUNDLE")]
    pub bundles: Vec<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report the state of packages and dotfiles without changing anything
    Doctor(BundleArgs),
    /// Install missing packages and link missing dotfiles
    Install(BundleArgs),
    /// Package operations only
    #[command(subcommand)]
    Dependencies(PartCommand),
    /// Dotfile operations only
    #[command(subcommand)]
    Dotfiles(DotfilesCommand),
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
    /// Print version information
    Version,
}

/// Subcommands of `dependencies` and `dotfiles`.
#[derive(Subcommand, Debug)]
pub enum PartCommand {
    /// List what the selected bundles declare
    List(BundleArgs),
    /// Apply only this part of the selected bundles
    Install(BundleArgs),
    /// Check only this part of the selected bundles
    Doctor(BundleArgs),
}

/// Subcommands of `dotfiles`.
#[derive(Subcommand, Debug)]
pub enum DotfilesCommand {
    /// `list`, `install` and `doctor`.
    #[command(flatten)]
    Part(PartCommand),
    /// Remove links and copies that still match their mapping
    Uninstall(BundleArgs),
}

impl Command {
    /// Short name used for the log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Doctor(_) => "doctor",
            Self::Install(_) => "install",
            Self::Dependencies(_) => "dependencies",
            Self::Dotfiles(_) => "dotfiles",
            Self::Completions { .. } => "completions",
            Self::Version => "version",
        }
    }
}
