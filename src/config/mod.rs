//! Configuration loading: `dots.toml` → settings + [`BundleRegistry`].
pub mod bundles;
pub mod expand;
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, DotsError};
use crate::platform::Platform;
use crate::registry::BundleRegistry;
use crate::resources::{FileSystemProbe, PackageManager};

use bundles::BundleSection;
use expand::Expander;
use validation::ValidationWarning;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dots.toml";

/// `[settings]` table as written.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    dotfiles_dir: Option<String>,
    package_manager: Option<String>,
}

/// The whole file as written.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    bundle: Vec<BundleSection>,
}

/// Loaded and resolved configuration.
#[derive(Debug)]
pub struct Config {
    /// Path of the file this was loaded from.
    pub path: PathBuf,
    /// Root of the dotfiles repository.
    pub dotfiles_dir: PathBuf,
    /// Package manager to drive, `None` if none is configured or detected.
    pub package_manager: Option<PackageManager>,
    /// Packages routed to a manager other than the default.
    pub package_overrides: HashMap<String, PackageManager>,
    /// Every declared bundle.
    pub registry: BundleRegistry,
    /// Non-fatal issues found while loading.
    pub warnings: Vec<ValidationWarning>,
}

impl Config {
    /// Load `path`, expanding paths against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DotsError::Config`] if the file is missing or malformed, and
    /// [`DotsError::Registry`] if two bundles share a name.
    pub fn load(
        path: &Path,
        platform: &Platform,
        fs: &dyn FileSystemProbe,
    ) -> Result<Self, DotsError> {
        let file: ConfigFile = toml_loader::load_config(path)?;
        Self::resolve(path, file, platform, fs, &Expander::from_env())
    }

    /// Parse config text as if it had been read from `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn from_str_with(
        path: &Path,
        content: &str,
        platform: &Platform,
        fs: &dyn FileSystemProbe,
        expander: &Expander,
    ) -> Result<Self, DotsError> {
        let file: ConfigFile = toml_loader::parse_config(content, &path.display().to_string())?;
        Self::resolve(path, file, platform, fs, expander)
    }

    fn resolve(
        path: &Path,
        file: ConfigFile,
        platform: &Platform,
        fs: &dyn FileSystemProbe,
        expander: &Expander,
    ) -> Result<Self, DotsError> {
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let dotfiles_dir = match &file.settings.dotfiles_dir {
            Some(dir) => {
                let expanded = expander.expand("settings", dir)?;
                if expanded.is_absolute() {
                    expanded
                } else {
                    config_dir.join(expanded)
                }
            }
            None => config_dir,
        };

        let package_manager = match &file.settings.package_manager {
            Some(name) => Some(name.parse::<PackageManager>()?),
            None => platform.default_package_manager(),
        };

        let package_overrides = collect_overrides(&file.bundle)?;
        let bundles = file
            .bundle
            .into_iter()
            .map(|section| section.into_bundle(&dotfiles_dir, expander))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let warnings = validation::validate_all(&bundles, fs);
        let registry = BundleRegistry::load(bundles)?;

        Ok(Self {
            path: path.to_path_buf(),
            dotfiles_dir,
            package_manager,
            package_overrides,
            registry,
            warnings,
        })
    }
}

fn collect_overrides(
    sections: &[BundleSection],
) -> Result<HashMap<String, PackageManager>, ConfigError> {
    let mut overrides: HashMap<String, PackageManager> = HashMap::new();
    for section in sections {
        for (package, manager) in section.package_overrides()? {
            match overrides.get(&package) {
                Some(&existing) if existing != manager => {
                    return Err(ConfigError::ConflictingManager {
                        package,
                        first: existing.to_string(),
                        second: manager.to_string(),
                    });
                }
                _ => {
                    overrides.insert(package, manager);
                }
            }
        }
    }
    Ok(overrides)
}
