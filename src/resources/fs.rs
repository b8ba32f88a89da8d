//! Filesystem observation for link planning.
//!
//! Provides the [`FileSystemProbe`] trait so that the planner can be
//! unit-tested without touching the real filesystem.  Production code uses
//! [`SystemFileSystem`]; tests use an in-memory world from
//! [`test_helpers`](crate::resources::test_helpers).

use std::fmt;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// Hex-encoded SHA-256 of a file, or of a directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash a byte slice.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// The full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve hex characters, for display.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.short())
    }
}

/// What currently occupies a path.
///
/// The symlink case carries the raw link contents, exactly as
/// `read_link` returns them; relative contents are not resolved here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Observation {
    /// Nothing exists at the path (not even a dangling symlink).
    Absent,
    /// A symbolic link with the given contents.
    SymlinkTo(PathBuf),
    /// A regular file with the given content hash.
    RegularFile(ContentHash),
    /// A real directory (not a symlink to one).
    Directory,
    /// Something exists but could not be inspected.
    Unreadable(String),
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "nothing"),
            Self::SymlinkTo(p) => write!(f, "symlink to {}", p.display()),
            Self::RegularFile(hash) => write!(f, "regular file ({hash})"),
            Self::Directory => write!(f, "directory"),
            Self::Unreadable(reason) => write!(f, "unreadable entry ({reason})"),
        }
    }
}

/// Read-only view of the filesystem used by the link planner.
///
/// Every method is side-effect-free.
pub trait FileSystemProbe: Send + Sync + fmt::Debug {
    /// Describe what occupies `path` without following a final symlink.
    fn observe(&self, path: &Path) -> Observation;

    /// Returns `true` if `path` exists, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Content hash of a regular file or of a whole directory tree.
    ///
    /// Returns `None` when `path` does not exist or cannot be read.
    fn digest(&self, path: &Path) -> Option<ContentHash>;
}

/// Production [`FileSystemProbe`] that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystem;

impl FileSystemProbe for SystemFileSystem {
    fn observe(&self, path: &Path) -> Observation {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Observation::Absent,
            Err(e) => return Observation::Unreadable(e.to_string()),
        };

        if meta.file_type().is_symlink() {
            return std::fs::read_link(path).map_or_else(
                |e| Observation::Unreadable(e.to_string()),
                Observation::SymlinkTo,
            );
        }
        if meta.is_dir() {
            return Observation::Directory;
        }
        hash_file(path).map_or_else(
            |e| Observation::Unreadable(e.to_string()),
            Observation::RegularFile,
        )
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn digest(&self, path: &Path) -> Option<ContentHash> {
        if path.is_dir() {
            let mut hasher = Sha256::new();
            hash_tree(path, path, &mut hasher).ok()?;
            Some(ContentHash(format!("{:x}", hasher.finalize())))
        } else {
            hash_file(path).ok()
        }
    }
}

fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(buf.get(..n).unwrap_or_default());
    }
    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Feed a directory tree into `hasher` in sorted path order.
///
/// Each entry contributes a type tag and its path relative to `base`; files
/// add their length and contents.  Symlinks inside the tree are followed,
/// matching how copies are made.
fn hash_tree(base: &Path, dir: &Path, hasher: &mut Sha256) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|entry| entry.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for entry in entries {
        let rel = entry.strip_prefix(base).unwrap_or(&entry);
        let is_dir = entry.is_dir();
        hasher.update(if is_dir { b"d" } else { b"f" });
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        if is_dir {
            hash_tree(base, &entry, hasher)?;
        } else {
            let content = std::fs::read(&entry)?;
            hasher.update(u64::try_from(content.len()).unwrap_or(u64::MAX).to_le_bytes());
            hasher.update(content);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn observe_absent() {
        let dir = tempfile::tempdir().unwrap();
        let probe = SystemFileSystem;
        assert_eq!(probe.observe(&dir.path().join("nope")), Observation::Absent);
    }

    #[test]
    fn observe_regular_file_hashes_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        std::fs::write(&path, b"hello").unwrap();

        let probe = SystemFileSystem;
        assert_eq!(
            probe.observe(&path),
            Observation::RegularFile(ContentHash::of_bytes(b"hello"))
        );
    }

    #[test]
    fn observe_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SystemFileSystem.observe(dir.path()), Observation::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn observe_symlink_reports_raw_contents() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("relative/target", &link).unwrap();

        assert_eq!(
            SystemFileSystem.observe(&link),
            Observation::SymlinkTo(PathBuf::from("relative/target"))
        );
        assert!(!SystemFileSystem.exists(&link), "dangling link does not exist");
    }

    #[test]
    fn digest_of_file_matches_observation_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        std::fs::write(&path, b"content").unwrap();

        assert_eq!(
            SystemFileSystem.digest(&path),
            Some(ContentHash::of_bytes(b"content"))
        );
    }

    #[test]
    fn digest_of_tree_is_stable_and_content_sensitive() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for root in [a.path(), b.path()] {
            std::fs::create_dir(root.join("sub")).unwrap();
            std::fs::write(root.join("one"), b"1").unwrap();
            std::fs::write(root.join("sub/two"), b"2").unwrap();
        }
        assert_eq!(
            SystemFileSystem.digest(a.path()),
            SystemFileSystem.digest(b.path())
        );

        std::fs::write(b.path().join("sub/two"), b"changed").unwrap();
        assert_ne!(
            SystemFileSystem.digest(a.path()),
            SystemFileSystem.digest(b.path())
        );
    }

    #[test]
    fn digest_of_tree_distinguishes_empty_dir_from_empty_file() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::create_dir(a.path().join("x")).unwrap();
        std::fs::write(b.path().join("x"), b"").unwrap();

        assert_ne!(
            SystemFileSystem.digest(a.path()),
            SystemFileSystem.digest(b.path())
        );
    }

    #[test]
    fn digest_of_tree_keeps_file_boundaries() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join("a"), b"xy").unwrap();
        std::fs::write(a.path().join("b"), b"").unwrap();
        std::fs::write(b.path().join("a"), b"x").unwrap();
        std::fs::write(b.path().join("b"), b"y").unwrap();

        assert_ne!(
            SystemFileSystem.digest(a.path()),
            SystemFileSystem.digest(b.path())
        );
    }

    #[test]
    fn digest_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SystemFileSystem.digest(&dir.path().join("gone")).is_none());
    }

    #[test]
    fn content_hash_display_is_short() {
        let hash = ContentHash::of_bytes(b"x");
        assert_eq!(hash.to_string().len(), "sha256:".len() + 12);
    }
}
