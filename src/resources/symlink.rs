//! Link and copy primitives used when a plan is applied.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{copy_dir_recursive, ensure_parent_dir};

/// Mutating side of the filesystem: creates the links a plan asks for.
///
/// Only the engine's Apply path calls into a `Linker`, and only for actions
/// the planner classified as creatable (or, under force, replaceable).
pub trait Linker: Send + Sync + std::fmt::Debug {
    /// Create a symlink at `target` pointing to `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing, the parent directory cannot
    /// be created, or the link cannot be made.
    fn create_symlink(&self, source: &Path, target: &Path) -> Result<()>;

    /// Copy `source` (a file or directory tree) to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or any copy step fails.
    fn copy(&self, source: &Path, target: &Path) -> Result<()>;

    /// Remove the symlink or regular file at `target`.
    ///
    /// Real directories are refused.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is a real directory or cannot be removed.
    fn remove(&self, target: &Path) -> Result<()>;
}

/// Production [`Linker`] backed by [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemLinker;

impl Linker for SystemLinker {
    fn create_symlink(&self, source: &Path, target: &Path) -> Result<()> {
        if !source.exists() {
            anyhow::bail!("source does not exist: {}", source.display());
        }
        ensure_parent_dir(target)?;
        create_symlink(source, target)
            .with_context(|| format!("create link: {}", target.display()))
    }

    fn copy(&self, source: &Path, target: &Path) -> Result<()> {
        if !source.exists() {
            anyhow::bail!("source does not exist: {}", source.display());
        }
        ensure_parent_dir(target)?;
        if source.is_dir() {
            copy_dir_into_place(source, target)
        } else {
            copy_file_into_place(source, target)
        }
    }

    fn remove(&self, target: &Path) -> Result<()> {
        let meta = std::fs::symlink_metadata(target)
            .with_context(|| format!("reading metadata: {}", target.display()))?;
        if meta.is_dir() && !meta.file_type().is_symlink() {
            anyhow::bail!("refusing to remove directory: {}", target.display());
        }
        remove_symlink(target)
    }
}

/// Sibling path used to stage a copy before it is renamed into place.
fn staging_path(target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target.file_name().map_or_else(
        || "dots_tmp".to_string(),
        |n| format!(".{}.dots_tmp", n.to_string_lossy()),
    );
    parent.join(name)
}

/// Copy a regular file: stage to a temp sibling, then rename it into place so
/// `target` never holds a partial file.
fn copy_file_into_place(source: &Path, target: &Path) -> Result<()> {
    let tmp = staging_path(target);
    std::fs::copy(source, &tmp)
        .with_context(|| format!("copy {} to {}", source.display(), tmp.display()))?;

    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("rename {} to {}", tmp.display(), target.display()));
    }
    Ok(())
}

/// Copy a directory: stage into a sibling temp directory, then rename it
/// into place.  Falls back to a plain copy when the rename fails.
fn copy_dir_into_place(source: &Path, target: &Path) -> Result<()> {
    let tmp = staging_path(target);
    let cleanup_dir = || {
        let _ = std::fs::remove_dir_all(&tmp);
    };

    if let Err(e) = copy_dir_recursive(source, &tmp) {
        cleanup_dir();
        return Err(e)
            .with_context(|| format!("recursive copy {} to {}", source.display(), tmp.display()));
    }

    if std::fs::rename(&tmp, target).is_err() {
        if let Err(e) = copy_dir_recursive(&tmp, target) {
            cleanup_dir();
            return Err(e).with_context(|| {
                format!("cross-fs copy {} to {}", tmp.display(), target.display())
            });
        }
        std::fs::remove_dir_all(&tmp)
            .with_context(|| format!("remove tmp dir: {}", tmp.display()))?;
    }
    Ok(())
}

/// Compare two paths for equality, handling UNC prefix normalization on Windows.
pub(crate) fn paths_equal(a: &Path, b: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        #[cfg(windows)]
        {
            let s = p.to_string_lossy();
            if let Some(stripped) = s.strip_prefix(r"\\?\") {
                return PathBuf::from(stripped);
            }
        }
        p.to_path_buf()
    };

    normalize(a) == normalize(b)
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }

    #[cfg(windows)]
    {
        use crate::exec::{Executor as _, SystemExecutor};

        let is_dir = target.is_dir();
        let result = if is_dir {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };

        if result.is_err() {
            // Fall back to mklink via cmd.exe (requires admin or dev mode).
            // /J makes a junction for directories.
            let link_str = link.to_string_lossy();
            let target_str = target.to_string_lossy();
            let mut args: Vec<&str> = vec!["/c", "mklink"];
            if is_dir {
                args.push("/J");
            }
            args.push(&link_str);
            args.push(&target_str);
            SystemExecutor.run("cmd", &args)?;
        }
    }

    Ok(())
}

/// Remove a symlink or file, handling platform differences.
///
/// On Windows, directory symlinks must be removed with `remove_dir` (not
/// `remove_file`), so the raw `FILE_ATTRIBUTE_DIRECTORY` flag is checked.
fn remove_symlink(path: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if is_dir_like(&meta) {
        std::fs::remove_dir(path)
            .with_context(|| format!("removing directory link: {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("removing file: {}", path.display()))?;
    }
    Ok(())
}

/// Check if metadata represents a directory-like entry.
fn is_dir_like(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x10 != 0 // FILE_ATTRIBUTE_DIRECTORY
    }
    #[cfg(not(windows))]
    {
        meta.is_dir()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn paths_equal_works() {
        let path1 = PathBuf::from("/tmp/test");
        let path2 = PathBuf::from("/tmp/test");
        assert!(paths_equal(&path1, &path2));

        let path3 = PathBuf::from("/tmp/other");
        assert!(!paths_equal(&path1, &path3));
    }

    #[cfg(unix)]
    #[test]
    fn create_symlink_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("nested/deeper/target");
        std::fs::write(&source, "x").unwrap();

        SystemLinker.create_symlink(&source, &target).unwrap();

        assert_eq!(std::fs::read_link(&target).unwrap(), source);
    }

    #[test]
    fn create_symlink_fails_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemLinker
            .create_symlink(&dir.path().join("missing"), &dir.path().join("target"))
            .unwrap_err();
        assert!(err.to_string().contains("source does not exist"), "{err}");
        assert!(!dir.path().join("target").exists());
    }

    #[test]
    fn copy_file_writes_content_and_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        let target = dir.path().join("out/target.txt");
        std::fs::write(&source, b"hello dots").unwrap();

        SystemLinker.copy(&source, &target).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"hello dots");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn copy_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src_dir");
        let target = dir.path().join("target_dir");
        std::fs::create_dir_all(source.join("sub")).unwrap();
        std::fs::write(source.join("a.txt"), b"aaa").unwrap();
        std::fs::write(source.join("sub/b.txt"), b"bbb").unwrap();

        SystemLinker.copy(&source, &target).unwrap();

        let meta = std::fs::symlink_metadata(&target).unwrap();
        assert!(meta.is_dir() && !meta.file_type().is_symlink());
        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn remove_refuses_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real");
        std::fs::create_dir(&target).unwrap();

        let err = SystemLinker.remove(&target).unwrap_err();
        assert!(err.to_string().contains("refusing"), "{err}");
        assert!(target.is_dir());
    }

    #[test]
    fn remove_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("file");
        std::fs::write(&target, "x").unwrap();

        SystemLinker.remove(&target).unwrap();
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("gone"), &target).unwrap();

        SystemLinker.remove(&target).unwrap();
        assert!(target.symlink_metadata().is_err());
    }
}
