//! Writing entries to the filesystem

use std::fs;
use std::path::{Component, Path};

use log::debug;

use crate::archive::VirtualFile;
use crate::decoder::TextballIter;
use crate::error::{Result, TextballError};
use crate::tree::{is_empty_dir, make_executable, PathFilter};

/// Options for [`unpack_textball`]
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Create missing parent directories of the target directory
    pub parents: bool,
    /// Allow unpacking into a directory that already has content
    pub exist_ok: bool,
    /// Entries whose relative path is rejected are not written
    pub path_filter: Option<PathFilter>,
}

impl UnpackOptions {
    /// Default options: no parents, target must be empty, no filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether missing parents of the target are created
    pub fn with_parents(mut self, parents: bool) -> Self {
        self.parents = parents;
        self
    }

    /// Set whether a non-empty target is accepted
    pub fn with_exist_ok(mut self, exist_ok: bool) -> Self {
        self.exist_ok = exist_ok;
        self
    }

    /// Set the filter applied to entry paths
    pub fn with_path_filter(mut self, filter: Option<PathFilter>) -> Self {
        self.path_filter = filter;
        self
    }
}

impl VirtualFile {
    /// Write this entry at `dest`, which must not exist yet. Missing parent
    /// directories are created; content is written byte for byte.
    pub fn write_to_destination(&self, dest: &Path) -> Result<()> {
        if dest.symlink_metadata().is_ok() {
            return Err(TextballError::Collision {
                path: dest.to_path_buf(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TextballError::io(parent, e))?;
        }
        match self.content() {
            None => fs::create_dir(dest).map_err(|e| TextballError::io(dest, e)),
            Some(content) => {
                fs::write(dest, content.as_bytes()).map_err(|e| TextballError::io(dest, e))?;
                if self.executable() {
                    make_executable(dest)?;
                }
                Ok(())
            }
        }
    }
}

/// Decoded paths come from untrusted documents and must stay below the target
fn check_safe_path(vfile: &VirtualFile) -> Result<()> {
    let safe = vfile
        .path()
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe && vfile.path().components().next().is_some() {
        Ok(())
    } else {
        Err(TextballError::UnsafePath {
            path: vfile.path().to_path_buf(),
        })
    }
}

fn prepare_unpack_dir(target_dir: &Path, options: &UnpackOptions) -> Result<()> {
    if target_dir.exists() {
        if !target_dir.is_dir() {
            return Err(TextballError::DirectoryState {
                path: target_dir.to_path_buf(),
                reason: "can not unpack textball in non-directory",
            });
        }
        if !options.exist_ok && !is_empty_dir(target_dir)? {
            return Err(TextballError::DirectoryState {
                path: target_dir.to_path_buf(),
                reason: "directory exists and is not empty",
            });
        }
        return Ok(());
    }

    if options.parents {
        fs::create_dir_all(target_dir).map_err(|e| TextballError::io(target_dir, e))
    } else {
        let parent_missing = target_dir
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty() && !p.is_dir());
        if parent_missing {
            return Err(TextballError::DirectoryState {
                path: target_dir.to_path_buf(),
                reason: "parent directory does not exist",
            });
        }
        fs::create_dir(target_dir).map_err(|e| TextballError::io(target_dir, e))
    }
}

fn unpack_entries(
    entries: TextballIter<'_>,
    target_dir: &Path,
    options: &UnpackOptions,
) -> Result<usize> {
    prepare_unpack_dir(target_dir, options)?;
    let mut written = 0;
    for vfile in entries {
        let vfile = vfile?;
        if let Some(filter) = &options.path_filter {
            if !filter.accepts(vfile.path()) {
                debug!("textball_unpack: ignoring {}", vfile.path().display());
                continue;
            }
        }
        check_safe_path(&vfile)?;
        let dest = target_dir.join(vfile.path());
        vfile.write_to_destination(&dest)?;
        debug!("textball_unpack: wrote {}", dest.display());
        written += 1;
    }
    Ok(written)
}

/// Unpack a textball held in memory below `target_dir`.
///
/// A malformed header is reported before the target is touched. Any existing
/// file at an entry's destination is an error even with `exist_ok`. Nothing
/// is rolled back when an entry fails midway. Returns the number of files
/// written.
pub fn unpack_textball(
    textball: &str,
    target_dir: impl AsRef<Path>,
    options: &UnpackOptions,
) -> Result<usize> {
    unpack_entries(TextballIter::new(textball)?, target_dir.as_ref(), options)
}

/// Unpack a textball file below `target_dir`, see [`unpack_textball`]
pub fn unpack_textball_file(
    textball: impl AsRef<Path>,
    target_dir: impl AsRef<Path>,
    options: &UnpackOptions,
) -> Result<usize> {
    unpack_entries(TextballIter::from_path(textball)?, target_dir.as_ref(), options)
}

/// Write entries from any producer below `target_base_dir`, which must be
/// empty or not exist yet. `write_callback` sees each destination path just
/// before it is written. Returns the number of entries written.
pub fn write_entries_to_directory<I>(
    entries: I,
    target_base_dir: impl AsRef<Path>,
    mut write_callback: Option<&mut dyn FnMut(&Path)>,
) -> Result<usize>
where
    I: IntoIterator<Item = Result<VirtualFile>>,
{
    let target = target_base_dir.as_ref();
    if target.exists() {
        if !target.is_dir() {
            return Err(TextballError::DirectoryState {
                path: target.to_path_buf(),
                reason: "target exists and is not a directory",
            });
        }
        if !is_empty_dir(target)? {
            return Err(TextballError::DirectoryState {
                path: target.to_path_buf(),
                reason: "target directory not empty",
            });
        }
    } else {
        fs::create_dir_all(target).map_err(|e| TextballError::io(target, e))?;
    }

    let mut written = 0;
    for vfile in entries {
        let vfile = vfile?;
        check_safe_path(&vfile)?;
        let dest = target.join(vfile.path());
        if let Some(callback) = write_callback.as_deref_mut() {
            callback(&dest);
        }
        vfile.write_to_destination(&dest)?;
        written += 1;
    }
    Ok(written)
}
