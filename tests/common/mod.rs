// Shared helpers for integration tests.
//
// Provides a temporary home directory and dotfiles repository, an in-memory
// package backend, and a silent logger, so each integration test can drive
// the engine against the real filesystem without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dots_cli::config::Config;
use dots_cli::config::expand::Expander;
use dots_cli::engine::EngineContext;
use dots_cli::logging::{Log, SummaryStatus};
use dots_cli::platform::{Distro, Os, Platform};
use dots_cli::resources::error::ResourceError;
use dots_cli::resources::{
    InstallResult, PackageInstaller, PackageProbe, SystemFileSystem, SystemLinker,
};

/// A [`Log`] that discards everything.
#[derive(Debug, Default)]
pub struct NullLog;

impl Log for NullLog {
    fn stage(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn debug(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn dry_run(&self, _: &str) {}
    fn record_bundle(&self, _: &str, _: SummaryStatus, _: Option<&str>) {}
}

/// Package database held in memory.
#[derive(Debug, Default)]
pub struct FakePackages {
    installed: Mutex<HashSet<String>>,
    broken: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakePackages {
    /// Packages whose install always fails.
    pub fn with_broken(names: &[&str]) -> Self {
        Self {
            broken: names.iter().map(|n| (*n).to_string()).collect(),
            ..Self::default()
        }
    }

    /// Packages passed to `install`, in order.
    pub fn install_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PackageProbe for FakePackages {
    fn is_installed(&self, name: &str) -> Result<bool, ResourceError> {
        Ok(self.installed.lock().unwrap().contains(name))
    }
}

impl PackageInstaller for FakePackages {
    fn install(&self, name: &str) -> InstallResult {
        self.calls.lock().unwrap().push(name.to_string());
        if self.broken.contains(name) {
            return InstallResult::Failure(format!("package '{name}' not found"));
        }
        self.installed.lock().unwrap().insert(name.to_string());
        InstallResult::Success
    }
}

/// An isolated home directory and dotfiles repository backed by a
/// [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory holding `home/` and `repo/`.
    pub root: tempfile::TempDir,
    /// Package backend shared by every engine context built from this one.
    pub packages: Arc<FakePackages>,
}

impl IntegrationTestContext {
    /// Create empty `home/` and `repo/` directories.
    pub fn new() -> Self {
        Self::with_packages(FakePackages::default())
    }

    /// Like [`new`](Self::new) with a preconfigured package backend.
    pub fn with_packages(packages: FakePackages) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("home")).expect("create home");
        std::fs::create_dir_all(root.path().join("repo")).expect("create repo");
        Self {
            root,
            packages: Arc::new(packages),
        }
    }

    /// The fake home directory.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// The dotfiles repository.
    pub fn repo(&self) -> PathBuf {
        self.root.path().join("repo")
    }

    /// Write a file under the repository, creating parents.
    pub fn repo_file(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.repo().join(rel), content)
    }

    /// Write a file under the home directory, creating parents.
    pub fn home_file(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.home().join(rel), content)
    }

    /// Write `dots.toml` into the repository and load it with `~` bound to
    /// the fake home directory.
    pub fn load_config(&self, toml: &str) -> Config {
        let path = self.repo().join("dots.toml");
        std::fs::write(&path, toml).expect("write dots.toml");
        let home = self.home();
        Config::from_str_with(
            &path,
            toml,
            &Platform::new(Os::Linux, Distro::Arch),
            &SystemFileSystem,
            &Expander::fixed(&home.display().to_string(), &[]),
        )
        .expect("load config")
    }

    /// Engine context over the real filesystem and the fake package backend.
    pub fn engine_context(&self) -> EngineContext {
        EngineContext::new(
            Arc::new(SystemFileSystem),
            Arc::new(SystemLinker),
            Arc::clone(&self.packages) as _,
            Arc::clone(&self.packages) as _,
            Arc::new(NullLog),
        )
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
    path.to_path_buf()
}

/// Two bundles: `base` (git + gitconfig) and `shell` (zsh + zshrc + a copied
/// ssh config) depending on it.
pub const TWO_BUNDLES: &str = r#"
[[bundle]]
name = "base"
packages = ["git"]
dotfiles = ["gitconfig"]

[[bundle]]
name = "shell"
depends = ["base"]
packages = ["zsh"]
dotfiles = [
  "zshrc",
  { source = "ssh/config", target = "~/.ssh/config", type = "copy" },
]
"#;

/// Populate the sources referenced by [`TWO_BUNDLES`].
pub fn write_two_bundle_sources(ctx: &IntegrationTestContext) {
    ctx.repo_file("base/gitconfig", "[user]\n  name = test\n");
    ctx.repo_file("shell/zshrc", "export EDITOR=vim\n");
    ctx.repo_file("shell/ssh/config", "Host *\n  ForwardAgent no\n");
}
