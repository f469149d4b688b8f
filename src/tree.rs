//! Directory traversal and permission helpers

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::archive::{Content, VirtualFile};
use crate::error::{Result, TextballError};

/// Predicate deciding whether a file takes part in an operation
#[derive(Clone)]
pub struct PathFilter(Arc<dyn Fn(&Path) -> bool + Send + Sync>);

impl PathFilter {
    pub fn new(filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(filter))
    }

    /// Filter dropping editor backups, swap files and OS metadata files
    pub fn spurious_files() -> Self {
        Self::new(exclude_spurious_files)
    }

    pub fn accepts(&self, path: &Path) -> bool {
        (self.0)(path)
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PathFilter(..)")
    }
}

/// Returns false for files that should never be archived: emacs/vi backup
/// and lock files (`*~`, `#*#`, `.#*`), vim swap files (`.*.sw?`),
/// `.DS_Store` and valgrind `vgcore.*` dumps. Only the file name is inspected.
pub fn exclude_spurious_files(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return true,
    };
    if name.contains('~') || name.contains('#') {
        return false;
    }
    if name.starts_with('.') {
        let tail_start = name
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        if name[tail_start..].starts_with(".sw") {
            return false;
        }
    }
    !(name == ".DS_Store" || name.starts_with("vgcore."))
}

/// True if the user-execute bit is set
#[cfg(unix)]
pub fn is_user_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).map_err(|e| TextballError::io(path, e))?;
    Ok(meta.permissions().mode() & 0o100 != 0)
}

#[cfg(not(unix))]
pub fn is_user_executable(_path: &Path) -> Result<bool> {
    Ok(false)
}

/// For each class (user/group/other) with the read bit set, also set the
/// execute bit.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .map_err(|e| TextballError::io(path, e))?
        .permissions();
    let mode = perms.mode();
    perms.set_mode(mode | ((mode & 0o444) >> 2));
    fs::set_permissions(path, perms).map_err(|e| TextballError::io(path, e))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

pub fn is_empty_dir(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    let mut entries = fs::read_dir(path).map_err(|e| TextballError::io(path, e))?;
    Ok(entries.next().is_none())
}

/// One item found while walking a tree
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Path on disk
    pub path: PathBuf,
    /// Path relative to the walked top directory
    pub relative: PathBuf,
    pub is_dir: bool,
}

/// Walk everything below `topdir` (not `topdir` itself) depth first, with the
/// entries of each directory sorted by name. That gives the same order as
/// sorting all relative paths component by component.
pub fn walk_sorted(topdir: impl AsRef<Path>) -> impl Iterator<Item = Result<TreeEntry>> {
    let topdir = topdir.as_ref().to_path_buf();
    WalkDir::new(&topdir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(move |entry| {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&topdir).to_path_buf();
                TextballError::io(path, e.into())
            })?;
            let path = entry.path().to_path_buf();
            let relative = path
                .strip_prefix(&topdir)
                .map_err(|_| TextballError::PathEncoding {
                    path: path.clone(),
                    reason: "path is not below the top directory",
                })?
                .to_path_buf();
            // follows symlinks, so a link to a directory counts as one
            let is_dir = path.is_dir();
            Ok(TreeEntry {
                path,
                relative,
                is_dir,
            })
        })
}

/// Read a file or directory from disk into a [`VirtualFile`] stored under `use_path`
pub fn path_to_vfile(source: &Path, use_path: impl Into<PathBuf>) -> Result<VirtualFile> {
    if source.is_dir() {
        return Ok(VirtualFile::dir(use_path));
    }
    let data = fs::read(source).map_err(|e| TextballError::io(source, e))?;
    let executable = is_user_executable(source)?;
    Ok(VirtualFile::file(use_path, Content::detect(data), executable))
}

/// Lazily yield every file below `topdir` accepted by `filter`, in sorted
/// order, with paths relative to `topdir`. Directories are not yielded.
pub fn tree_entries(
    topdir: impl AsRef<Path>,
    filter: Option<PathFilter>,
) -> impl Iterator<Item = Result<VirtualFile>> {
    walk_sorted(topdir).filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };
        if entry.is_dir {
            return None;
        }
        if let Some(filter) = &filter {
            if !filter.accepts(&entry.path) {
                return None;
            }
        }
        Some(path_to_vfile(&entry.path, entry.relative))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_spurious_files_excluded() {
        for name in [
            "notes.txt~",
            "#main.cc#",
            ".#main.cc",
            ".main.cc.swp",
            ".main.cc.swo",
            ".DS_Store",
            "vgcore.1234",
        ] {
            assert!(!exclude_spurious_files(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn test_regular_files_kept() {
        for name in ["main.cc", ".gitignore", "swap.sw", "pkg.info", "sub/dir/vgcore"] {
            assert!(exclude_spurious_files(Path::new(name)), "{}", name);
        }
    }

    #[test]
    fn test_only_file_name_inspected() {
        assert!(exclude_spurious_files(Path::new("backup~/a.txt")));
    }

    #[test]
    fn test_walk_sorted_order() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a/b"), "").unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        fs::write(tmp.path().join("0.txt"), "").unwrap();

        let relatives: Vec<PathBuf> = walk_sorted(tmp.path())
            .map(|e| e.unwrap().relative)
            .collect();
        assert_eq!(
            relatives,
            vec![
                PathBuf::from("0.txt"),
                PathBuf::from("a"),
                PathBuf::from("a/b"),
                PathBuf::from("a.txt"),
            ]
        );
    }

    #[test]
    fn test_tree_entries_skip_dirs_and_filtered() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub/empty")).unwrap();
        fs::write(tmp.path().join("sub/x.txt"), "x").unwrap();
        fs::write(tmp.path().join("sub/x.txt~"), "backup").unwrap();
        fs::write(tmp.path().join("data.bin"), [0xFFu8, 0x00]).unwrap();

        let entries: Vec<VirtualFile> = tree_entries(tmp.path(), Some(PathFilter::spurious_files()))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path(), Path::new("data.bin"));
        assert_eq!(entries[0].content(), Some(&Content::Binary(vec![0xFF, 0x00])));
        assert_eq!(entries[1].path(), Path::new("sub/x.txt"));
        assert_eq!(entries[1].content(), Some(&Content::from("x")));
    }

    #[test]
    fn test_path_to_vfile_directory() {
        let tmp = TempDir::new().unwrap();
        let vfile = path_to_vfile(tmp.path(), "skel").unwrap();
        assert!(vfile.is_dir());
        assert!(vfile.content().is_none());
    }

    #[test]
    fn test_is_empty_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(is_empty_dir(tmp.path()).unwrap());
        fs::write(tmp.path().join("f"), "").unwrap();
        assert!(!is_empty_dir(tmp.path()).unwrap());
        assert!(!is_empty_dir(&tmp.path().join("f")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable_follows_read_bits() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("run.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        assert!(!is_user_executable(&path).unwrap());

        make_executable(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
        assert!(is_user_executable(&path).unwrap());
    }
}
