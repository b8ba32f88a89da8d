//! Bundle reconciliation engine for dotfiles and system packages.
//!
//! A machine's configuration is declared as named bundles in `dots.toml`.
//! Each bundle lists system packages, dotfile mappings, and the bundles it
//! depends on.  The engine checks or converges the live system against that
//! declaration, one bundle at a time in dependency order.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: parse and validate `dots.toml` into a [`registry::BundleRegistry`]
//! - **[`engine`]**: dependency ordering, link planning and reconciliation
//! - **[`resources`]**: capability traits and their production backends
//! - **[`commands`]**: top-level subcommand orchestration (`doctor`, `install`, ...)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod registry;
pub mod report;
pub mod resources;
