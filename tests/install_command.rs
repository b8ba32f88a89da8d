#![cfg(unix)]
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for converging bundles on a real filesystem.
//!
//! Each test builds a temporary home directory and dotfiles repository, loads
//! a `dots.toml` through the public config API, and runs the engine in Apply
//! mode with a fake package backend.

mod common;

use common::*;
use dots_cli::engine::{
    BundleStatus, Engine, LinkActionKind, LinkApplied, PackageApplied, RunOptions, Scope,
};

// ---------------------------------------------------------------------------
// Convergence
// ---------------------------------------------------------------------------

#[test]
fn install_creates_links_copies_and_packages() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run::<&str>(&[], RunOptions::apply(Scope::Both))
        .unwrap();

    assert!(report.is_success(), "{report:#?}");
    assert_eq!(ctx.packages.install_calls(), vec!["git", "zsh"]);

    let zshrc = ctx.home().join(".zshrc");
    assert_eq!(
        std::fs::read_link(&zshrc).unwrap(),
        ctx.repo().join("shell/zshrc")
    );
    let ssh = ctx.home().join(".ssh/config");
    assert!(!ssh.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(
        std::fs::read_to_string(&ssh).unwrap(),
        "Host *\n  ForwardAgent no\n"
    );
}

#[test]
fn second_install_changes_nothing() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();
    let engine = Engine::new(&config.registry, &ectx);

    engine
        .run::<&str>(&[], RunOptions::apply(Scope::Both))
        .unwrap();
    let second = engine
        .run::<&str>(&[], RunOptions::apply(Scope::Both))
        .unwrap();

    assert!(second.is_success());
    assert_eq!(ctx.packages.install_calls().len(), 2);
    for outcome in &second.outcomes {
        assert!(
            outcome
                .packages
                .iter()
                .all(|p| p.applied == PackageApplied::Unchanged)
        );
        assert!(
            outcome
                .links
                .iter()
                .all(|l| l.action.kind == LinkActionKind::AlreadySatisfied)
        );
    }
}

#[test]
fn install_selected_bundle_pulls_in_dependencies() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run(&["shell"], RunOptions::apply(Scope::Links))
        .unwrap();

    let names: Vec<_> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["base", "shell"]);
    assert!(ctx.home().join(".gitconfig").symlink_metadata().is_ok());
    assert!(ctx.packages.install_calls().is_empty());
}

// ---------------------------------------------------------------------------
// Conflicts and force
// ---------------------------------------------------------------------------

#[test]
fn existing_file_is_refused_and_dependents_skipped() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    ctx.home_file(".gitconfig", "handwritten\n");
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run::<&str>(&[], RunOptions::apply(Scope::Both))
        .unwrap();

    let base = report.outcome("base").unwrap();
    assert!(matches!(base.links[0].applied, LinkApplied::Refused(_)));
    assert!(matches!(base.status, BundleStatus::Failed(_)));
    assert!(matches!(
        report.outcome("shell").unwrap().status,
        BundleStatus::Skipped(_)
    ));
    assert_eq!(
        std::fs::read_to_string(ctx.home().join(".gitconfig")).unwrap(),
        "handwritten\n"
    );
    assert!(ctx.home().join(".zshrc").symlink_metadata().is_err());
    assert_eq!(ctx.packages.install_calls(), vec!["git"]);
}

#[test]
fn force_replaces_file_but_never_directory() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    ctx.home_file(".gitconfig", "handwritten\n");
    ctx.home_file(".zshrc/keep", "precious\n");
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run::<&str>(&[], RunOptions::apply(Scope::Links).with_force(true))
        .unwrap();

    assert_eq!(
        report.outcome("base").unwrap().links[0].applied,
        LinkApplied::Replaced
    );
    assert!(
        std::fs::symlink_metadata(ctx.home().join(".gitconfig"))
            .unwrap()
            .file_type()
            .is_symlink()
    );

    let shell = report.outcome("shell").unwrap();
    assert!(matches!(shell.links[0].applied, LinkApplied::Refused(_)));
    assert_eq!(
        std::fs::read_to_string(ctx.home().join(".zshrc/keep")).unwrap(),
        "precious\n"
    );
}

#[test]
fn dangling_symlink_is_reported_as_broken() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    std::os::unix::fs::symlink("/nonexistent/gitconfig", ctx.home().join(".gitconfig")).unwrap();
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run(&["base"], RunOptions::apply(Scope::Links))
        .unwrap();

    let link = &report.outcome("base").unwrap().links[0];
    assert_eq!(link.action.kind, LinkActionKind::BrokenLink);
    assert!(matches!(link.applied, LinkApplied::Refused(_)));
}

// ---------------------------------------------------------------------------
// Failure isolation and dry-run
// ---------------------------------------------------------------------------

#[test]
fn install_failure_skips_dependents_and_own_links() {
    let ctx = IntegrationTestContext::with_packages(FakePackages::with_broken(&["git"]));
    write_two_bundle_sources(&ctx);
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run::<&str>(&[], RunOptions::apply(Scope::Both))
        .unwrap();

    let base = report.outcome("base").unwrap();
    assert!(matches!(base.status, BundleStatus::Failed(_)));
    assert_eq!(base.links[0].applied, LinkApplied::NotAttempted);
    assert_eq!(
        report.outcome("shell").unwrap().status,
        BundleStatus::Skipped("dependency 'base' failed".to_string())
    );
    assert_eq!(ctx.packages.install_calls(), vec!["git"]);
    assert!(ctx.home().join(".gitconfig").symlink_metadata().is_err());
}

#[test]
fn dry_run_touches_nothing() {
    let ctx = IntegrationTestContext::new();
    write_two_bundle_sources(&ctx);
    let config = ctx.load_config(TWO_BUNDLES);
    let ectx = ctx.engine_context();

    let report = Engine::new(&config.registry, &ectx)
        .run::<&str>(&[], RunOptions::apply(Scope::Both).with_dry_run(true))
        .unwrap();

    assert!(report.is_success());
    assert!(report.dry_run);
    assert!(ctx.packages.install_calls().is_empty());
    assert_eq!(std::fs::read_dir(ctx.home()).unwrap().count(), 0);
    let shell = report.outcome("shell").unwrap();
    assert!(shell.links.iter().all(|l| l.applied == LinkApplied::Created));
}
