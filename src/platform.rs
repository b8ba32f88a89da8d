//! Host platform detection.
use std::fmt;
use std::path::Path;

use crate::resources::PackageManager;

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux or another Unix-like system.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Linux distribution family, as far as package management is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    /// Arch Linux and derivatives (`/etc/arch-release`).
    Arch,
    /// Debian and derivatives (`/etc/debian_version`).
    Debian,
    /// Anything else, including non-Linux systems.
    Other,
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// Distribution family.
    pub distro: Distro,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        let os = Self::detect_os();
        let distro = if os == Os::Linux {
            Self::detect_distro(Path::new("/etc"))
        } else {
            Distro::Other
        };
        Self { os, distro }
    }

    /// Create a platform with explicit values (for testing).
    #[must_use]
    pub const fn new(os: Os, distro: Distro) -> Self {
        Self { os, distro }
    }

    /// The package manager to use when the config does not name one.
    #[must_use]
    pub const fn default_package_manager(&self) -> Option<PackageManager> {
        match (self.os, self.distro) {
            (Os::Linux, Distro::Arch) => Some(PackageManager::Pacman),
            (Os::Linux, Distro::Debian) => Some(PackageManager::Apt),
            (Os::Linux, Distro::Other) => None,
            (Os::MacOs, _) => Some(PackageManager::Brew),
            (Os::Windows, _) => Some(PackageManager::Winget),
        }
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            // Other Unix-like systems are treated as Linux
            Os::Linux
        }
    }

    fn detect_distro(etc: &Path) -> Distro {
        if etc.join("arch-release").exists() {
            Distro::Arch
        } else if etc.join("debian_version").exists() {
            Distro::Debian
        } else {
            Distro::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.distro {
            Distro::Arch => write!(f, "{} (arch)", self.os),
            Distro::Debian => write!(f, "{} (debian)", self.os),
            Distro::Other => write!(f, "{}", self.os),
        }
    }
}
