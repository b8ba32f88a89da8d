//! System package probing and installation.
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::ConfigError;
use crate::exec::Executor;

use super::error::ResourceError;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// Official Arch Linux packages (pacman).
    Pacman,
    /// AUR helper (paru).
    Paru,
    /// AUR helper (yay).
    Yay,
    /// Debian and derivatives (apt / dpkg).
    Apt,
    /// Homebrew.
    Brew,
    /// Windows packages (winget).
    Winget,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for PackageManager {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pacman" => Ok(Self::Pacman),
            "paru" => Ok(Self::Paru),
            "yay" => Ok(Self::Yay),
            "apt" | "apt-get" => Ok(Self::Apt),
            "brew" | "homebrew" => Ok(Self::Brew),
            "winget" => Ok(Self::Winget),
            _ => Err(ConfigError::UnknownPackageManager(s.to_string())),
        }
    }
}

impl PackageManager {
    /// The binary this manager installs with.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Pacman => "pacman",
            Self::Paru => "paru",
            Self::Yay => "yay",
            Self::Apt => "apt-get",
            Self::Brew => "brew",
            Self::Winget => "winget",
        }
    }

    /// The binary used to list installed packages.
    ///
    /// AUR helpers share pacman's local database.
    const fn query_program(self) -> &'static str {
        match self {
            Self::Pacman | Self::Paru | Self::Yay => "pacman",
            Self::Apt => "dpkg-query",
            Self::Brew => "brew",
            Self::Winget => "winget",
        }
    }

    /// Query the full set of installed package names in a single command.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::BackendUnavailable`] if the query program is
    /// not on `PATH`, or [`ResourceError::ProbeUnavailable`] if the query
    /// exits non-zero.
    pub fn installed_packages(
        self,
        executor: &dyn Executor,
    ) -> Result<HashSet<String>, ResourceError> {
        let program = self.query_program();
        if !executor.which(program) {
            return Err(ResourceError::BackendUnavailable {
                program: program.to_string(),
            });
        }

        let args: &[&str] = match self {
            // One line per package: "name version".
            Self::Pacman | Self::Paru | Self::Yay => &["-Q"],
            // "ii git" for installed packages; other status prefixes are
            // removed or half-configured.
            Self::Apt => &["-W", "-f=${db:Status-Abbrev} ${Package}\\n"],
            Self::Brew => &["list", "-1"],
            Self::Winget => &[
                "list",
                "--accept-source-agreements",
                "--disable-interactivity",
            ],
        };

        let result =
            executor
                .run_unchecked(program, args)
                .map_err(|e| ResourceError::ProbeUnavailable {
                    program: program.to_string(),
                    reason: format!("{e:#}"),
                })?;
        if !result.success {
            return Err(ResourceError::ProbeUnavailable {
                program: program.to_string(),
                reason: result.stderr.trim().to_string(),
            });
        }

        let stdout = result.stdout;
        let set = match self {
            Self::Pacman | Self::Paru | Self::Yay | Self::Brew => stdout
                .lines()
                .filter_map(|line| line.split_whitespace().next())
                .map(str::to_string)
                .collect(),
            Self::Apt => stdout
                .lines()
                .filter_map(|line| {
                    let mut parts = line.split_whitespace();
                    match (parts.next(), parts.next()) {
                        (Some(status), Some(name)) if status.starts_with("ii") => {
                            Some(name.to_string())
                        }
                        _ => None,
                    }
                })
                .collect(),
            // `winget list` prints a table; IDs are reverse-domain names so
            // exact token matches do not collide with versions.
            Self::Winget => stdout
                .lines()
                .flat_map(str::split_whitespace)
                .map(str::to_string)
                .collect(),
        };
        Ok(set)
    }

    /// Install a single package.
    #[must_use]
    pub fn install(self, executor: &dyn Executor, name: &str) -> InstallResult {
        let (program, args): (&str, Vec<&str>) = match self {
            Self::Pacman => (
                "sudo",
                vec![
                    "pacman",
                    "-S",
                    "--needed",
                    "--noconfirm",
                    "--noprogressbar",
                    name,
                ],
            ),
            // AUR helpers escalate on their own.
            Self::Paru | Self::Yay => (
                self.program(),
                vec!["-S", "--needed", "--noconfirm", "--noprogressbar", name],
            ),
            Self::Apt => ("sudo", vec!["apt-get", "install", "-y", name]),
            Self::Brew => ("brew", vec!["install", name]),
            Self::Winget => (
                "winget",
                vec![
                    "install",
                    "--id",
                    name,
                    "--exact",
                    "--source",
                    "winget",
                    "--accept-source-agreements",
                    "--accept-package-agreements",
                ],
            ),
        };

        let result = match executor.run_unchecked(program, &args) {
            Ok(result) => result,
            Err(e) => return InstallResult::Failure(format!("{e:#}")),
        };
        if result.success {
            return InstallResult::Success;
        }

        let stderr = result.stderr.trim();
        if stderr.contains("could not find all required packages")
            || stderr.contains("target not found")
            || stderr.contains("Unable to locate package")
            || stderr.contains("No available formula")
        {
            return InstallResult::Failure(format!("package '{name}' not found"));
        }
        // winget writes most diagnostics to stdout, not stderr.
        let detail = if stderr.is_empty() {
            result.stdout.trim().to_string()
        } else {
            stderr.to_string()
        };
        InstallResult::Failure(
            ResourceError::ExecutionFailed {
                program: self.program().to_string(),
                exit_code: result.code.unwrap_or(-1),
                stderr: detail,
            }
            .to_string(),
        )
    }
}

/// Outcome of a single install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    /// The package is now installed.
    Success,
    /// The installer failed with the given reason.
    Failure(String),
}

/// Answers whether a package is installed.
pub trait PackageProbe: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `name` is installed.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot answer; the engine treats
    /// the package's state as unknown.
    fn is_installed(&self, name: &str) -> Result<bool, ResourceError>;
}

/// Installs packages.
#[cfg_attr(test, mockall::automock)]
pub trait PackageInstaller: Send + Sync + std::fmt::Debug {
    /// Install `name`, reporting success or a failure reason.
    fn install(&self, name: &str) -> InstallResult;
}

/// Production package probe and installer driven through an [`Executor`].
///
/// Packages go to the default manager unless an override names another one.
/// Each installed set is queried once, on first use, and kept up to date as
/// packages are installed.  Managers sharing a database (pacman and the AUR
/// helpers) share one cached set.
#[derive(Debug)]
pub struct PackageBackend {
    manager: Option<PackageManager>,
    overrides: HashMap<String, PackageManager>,
    executor: Arc<dyn Executor>,
    installed: Mutex<HashMap<&'static str, HashSet<String>>>,
}

impl PackageBackend {
    /// Create a backend whose default is `manager`.
    ///
    /// `None` means no supported manager was found for this machine; probes
    /// of packages without an override then report
    /// [`ResourceError::NoPackageManager`].
    #[must_use]
    pub fn new(manager: Option<PackageManager>, executor: Arc<dyn Executor>) -> Self {
        Self {
            manager,
            overrides: HashMap::new(),
            executor,
            installed: Mutex::new(HashMap::new()),
        }
    }

    /// Route the named packages to specific managers.
    #[must_use]
    pub fn with_overrides(mut self, overrides: HashMap<String, PackageManager>) -> Self {
        self.overrides = overrides;
        self
    }

    /// The manager that handles `name`, if any.
    #[must_use]
    pub fn manager_for(&self, name: &str) -> Option<PackageManager> {
        self.overrides.get(name).copied().or(self.manager)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, HashSet<String>>> {
        self.installed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PackageProbe for PackageBackend {
    fn is_installed(&self, name: &str) -> Result<bool, ResourceError> {
        let manager = self
            .manager_for(name)
            .ok_or(ResourceError::NoPackageManager)?;
        let key = manager.query_program();
        let mut cache = self.cache();
        if !cache.contains_key(key) {
            let set = manager.installed_packages(self.executor.as_ref())?;
            tracing::debug!(manager = %manager, count = set.len(), "queried installed packages");
            cache.insert(key, set);
        }
        Ok(cache.get(key).is_some_and(|set| set.contains(name)))
    }
}

impl PackageInstaller for PackageBackend {
    fn install(&self, name: &str) -> InstallResult {
        let Some(manager) = self.manager_for(name) else {
            return InstallResult::Failure(ResourceError::NoPackageManager.to_string());
        };
        let result = manager.install(self.executor.as_ref(), name);
        if result == InstallResult::Success
            && let Some(set) = self.cache().get_mut(manager.query_program())
        {
            set.insert(name.to_string());
        }
        result
    }
}
