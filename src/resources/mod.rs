//! Capability traits the engine depends on, and their production backends.
//!
//! The engine only ever talks to [`FileSystemProbe`], [`PackageProbe`],
//! [`PackageInstaller`] and [`Linker`].  The commands layer wires in
//! [`SystemFileSystem`], [`SystemLinker`] and [`PackageBackend`].
pub mod error;
pub mod fs;
pub mod helpers;
pub mod package;
pub mod symlink;

pub use fs::{ContentHash, FileSystemProbe, Observation, SystemFileSystem};
pub use package::{InstallResult, PackageBackend, PackageInstaller, PackageManager, PackageProbe};
pub use symlink::{Linker, SystemLinker};


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::test_helpers::MemoryWorld;
    use super::*;
    use std::path::{Path, PathBuf};

    #[test]
    fn memory_world_symlink_becomes_observable() {
        let world = MemoryWorld::new().with_file("/repo/base/zshrc", "export A=1");
        world
            .create_symlink(Path::new("/repo/base/zshrc"), Path::new("/home/u/.zshrc"))
            .unwrap();

        assert_eq!(
            world.observe(Path::new("/home/u/.zshrc")),
            Observation::SymlinkTo(PathBuf::from("/repo/base/zshrc"))
        );
        assert!(world.exists(Path::new("/home/u/.zshrc")));
    }

    #[test]
    fn memory_world_parent_directories_are_implicit() {
        let world = MemoryWorld::new().with_file("/home/u/.config/nvim/init.lua", "");
        assert_eq!(
            world.observe(Path::new("/home/u/.config")),
            Observation::Directory
        );
        assert!(world.exists(Path::new("/home/u/.config/nvim")));
    }

    #[test]
    fn memory_world_copy_tree_matches_digest() {
        let world = MemoryWorld::new()
            .with_file("/repo/nvim/init.lua", "set nu")
            .with_file("/repo/nvim/lua/plugins.lua", "return {}");
        world
            .copy(Path::new("/repo/nvim"), Path::new("/home/u/.config/nvim"))
            .unwrap();

        assert_eq!(
            world.digest(Path::new("/repo/nvim")),
            world.digest(Path::new("/home/u/.config/nvim"))
        );
    }

    #[test]
    fn memory_world_remove_refuses_directories() {
        let world = MemoryWorld::new().with_dir("/home/u/.zshrc");
        assert!(world.remove(Path::new("/home/u/.zshrc")).is_err());
        assert_eq!(
            world.observe(Path::new("/home/u/.zshrc")),
            Observation::Directory
        );
    }

    #[test]
    fn memory_world_install_is_visible_to_probe() {
        let world = MemoryWorld::new().with_uninstallable("nope");
        assert!(!world.is_installed("zsh").unwrap());
        assert_eq!(world.install("zsh"), InstallResult::Success);
        assert!(world.is_installed("zsh").unwrap());
        assert!(matches!(world.install("nope"), InstallResult::Failure(_)));
        assert_eq!(world.install_calls(), vec!["zsh", "nope"]);
    }
}
