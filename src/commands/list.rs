//! Command: list what the selected bundles declare.
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::CommandSetup;
use crate::cli::{BundleArgs, GlobalOpts};
use crate::engine::{Engine, Scope};
use crate::logging::Logger;
use crate::registry::{BundleRegistry, LinkType};

/// One bundle's declared items, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Bundle name.
    pub bundle: String,
    /// Declared packages (empty when listing dotfiles).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    /// Declared dotfiles (empty when listing packages).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dotfiles: Vec<ListedDotfile>,
}

/// A declared dotfile mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedDotfile {
    /// Absolute source path.
    pub source: PathBuf,
    /// Absolute target path.
    pub target: PathBuf,
    /// Symlink or copy.
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

/// Collect the `scope` part of every selected bundle, dependencies first.
///
/// # Errors
///
/// Returns an error if the selection is structurally invalid.
pub fn collect(
    registry: &BundleRegistry,
    engine: &Engine<'_>,
    bundles: &[String],
    scope: Scope,
) -> Result<Vec<Listing>> {
    let order = engine.order(bundles)?;
    let mut listings = Vec::with_capacity(order.len());
    for name in order {
        let bundle = registry.lookup(&name)?;
        let packages = if scope.packages() {
            bundle.packages.clone()
        } else {
            Vec::new()
        };
        let dotfiles = if scope.links() {
            bundle
                .dotfiles
                .iter()
                .map(|m| ListedDotfile {
                    source: m.source.clone(),
                    target: m.target.clone(),
                    link_type: m.link_type,
                })
                .collect()
        } else {
            Vec::new()
        };
        listings.push(Listing {
            bundle: name,
            packages,
            dotfiles,
        });
    }
    Ok(listings)
}

/// Render listings as plain text, one line per item.
#[must_use]
pub fn render(listings: &[Listing]) -> String {
    let mut out = String::new();
    for listing in listings {
        for pkg in &listing.packages {
            out.push_str(&format!("{}\t{pkg}\n", listing.bundle));
        }
        for dotfile in &listing.dotfiles {
            out.push_str(&format!(
                "{}\t{} -> {} ({})\n",
                listing.bundle,
                dotfile.target.display(),
                dotfile.source.display(),
                dotfile.link_type
            ));
        }
    }
    out
}

/// Print the declared packages or dotfiles of the selected bundles.
///
/// # Errors
///
/// Returns an error if configuration loading fails or the selection is invalid.
#[allow(clippy::print_stdout)]
pub fn run(
    global: &GlobalOpts,
    args: &BundleArgs,
    scope: Scope,
    log: &Arc<Logger>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.engine_context(Arc::clone(log) as _, Arc::clone(cancel));
    let engine = Engine::new(&setup.config.registry, &ctx);
    let listings = collect(&setup.config.registry, &engine, &args.bundles, scope)?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else {
        print!("{}", render(&listings));
    }
    Ok(())
}
