//! Textball encoder

use std::fs;
use std::path::{Component, Path};

use log::{debug, info, warn};

use crate::archive::{
    Content, VirtualFile, BINARY_MARKER, BINARY_WRAP_COLUMN, EXECUTABLE_MARKER, HEADER, MARKERS,
    PATH_TERMINATOR, TEXT_MARKER,
};
use crate::ascii85;
use crate::error::{Result, TextballError};
use crate::tree::{is_empty_dir, is_user_executable, walk_sorted, PathFilter};

/// Options for [`create_textball`]
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Files rejected by the filter are left out. `None` accepts everything.
    pub path_filter: Option<PathFilter>,
    /// Report empty directories, which the format can not store, as warnings
    pub include_empty_dirs: bool,
    /// Tag files with the user-execute bit set
    pub mark_executable_files: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            path_filter: Some(PathFilter::spurious_files()),
            include_empty_dirs: true,
            mark_executable_files: true,
        }
    }
}

impl CreateOptions {
    /// Set the path filter, `None` to keep every file
    pub fn with_path_filter(mut self, filter: Option<PathFilter>) -> Self {
        self.path_filter = filter;
        self
    }

    /// Set whether skipped empty directories are reported as warnings
    pub fn with_include_empty_dirs(mut self, include: bool) -> Self {
        self.include_empty_dirs = include;
        self
    }

    /// Set whether executable files are tagged
    pub fn with_mark_executable_files(mut self, mark: bool) -> Self {
        self.mark_executable_files = mark;
        self
    }
}

/// Accumulates sections into a textball document.
///
/// Every section is validated before it is appended, so a failed
/// [`Encoder::add`] leaves the document as it was.
pub struct Encoder {
    output: String,
}

impl Encoder {
    /// Create a new encoder holding just the header
    pub fn new() -> Self {
        Self {
            output: HEADER.to_string(),
        }
    }

    /// Append one entry. Directory entries can not be stored and are skipped.
    pub fn add(&mut self, vfile: &VirtualFile) -> Result<()> {
        let content = match vfile.content() {
            Some(content) if !vfile.is_dir() => content,
            _ => {
                warn!("textball: skipping directory entry {}", vfile.path().display());
                return Ok(());
            }
        };
        let path = relative_path_string(vfile.path())?;
        self.add_section(vfile.path(), &path, content, vfile.executable())
    }

    fn add_section(
        &mut self,
        source: &Path,
        path: &str,
        content: &Content,
        executable: bool,
    ) -> Result<()> {
        let encoded;
        let (marker, body) = match content {
            Content::Text(text) => {
                check_magic_collision(source, text)?;
                (TEXT_MARKER, text.as_str())
            }
            Content::Binary(data) => {
                encoded = ascii85::encode(data, BINARY_WRAP_COLUMN);
                (BINARY_MARKER, encoded.as_str())
            }
        };

        self.output.push_str(marker);
        if executable {
            self.output.push_str(EXECUTABLE_MARKER);
        }
        self.output.push_str(path);
        self.output.push_str(PATH_TERMINATOR);
        self.output.push_str(body);
        Ok(())
    }

    /// Number of bytes in the document so far
    pub fn len(&self) -> usize {
        self.output.len()
    }

    /// True while no section has been added
    pub fn is_empty(&self) -> bool {
        self.output.len() == HEADER.len()
    }

    /// Finish the document
    pub fn finish(self) -> String {
        self.output
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a sequence of entries. Stops at the first error without
/// producing a document.
pub fn encode_entries<I>(entries: I) -> Result<String>
where
    I: IntoIterator<Item = Result<VirtualFile>>,
{
    let mut encoder = Encoder::new();
    for vfile in entries {
        encoder.add(&vfile?)?;
    }
    Ok(encoder.finish())
}

/// Snapshot every file below `topdir` into a textball string.
///
/// Files are visited in sorted relative-path order. Any invalid path or
/// magic collision aborts the whole operation.
pub fn create_textball(topdir: impl AsRef<Path>, options: &CreateOptions) -> Result<String> {
    let topdir = topdir.as_ref();
    if !topdir.is_dir() {
        return Err(TextballError::DirectoryState {
            path: topdir.to_path_buf(),
            reason: "not an existing directory",
        });
    }

    let mut encoder = Encoder::new();
    for entry in walk_sorted(topdir) {
        let entry = entry?;
        if entry.is_dir {
            if is_empty_dir(&entry.path)? {
                if options.include_empty_dirs {
                    warn!(
                        "textball_create: empty directory {} can not be stored, skipping",
                        entry.relative.display()
                    );
                } else {
                    debug!("textball_create: skipping empty directory {}", entry.relative.display());
                }
            }
            continue;
        }

        let relpath = relative_path_string(&entry.relative)?;
        if let Some(filter) = &options.path_filter {
            if !filter.accepts(&entry.path) {
                info!("textball_create: ignoring {}", relpath);
                continue;
            }
        }
        info!("textball_create: processing {}", relpath);

        let data = fs::read(&entry.path).map_err(|e| TextballError::io(&entry.path, e))?;
        let executable = options.mark_executable_files && is_user_executable(&entry.path)?;
        encoder.add_section(&entry.relative, &relpath, &Content::detect(data), executable)?;
    }
    Ok(encoder.finish())
}

/// Like [`create_textball`], additionally writing the document to `target`
/// byte for byte.
pub fn create_textball_file(
    topdir: impl AsRef<Path>,
    target: impl AsRef<Path>,
    options: &CreateOptions,
) -> Result<String> {
    let textball = create_textball(topdir, options)?;
    let target = target.as_ref();
    info!("textball_create: writing {}", target.display());
    fs::write(target, textball.as_bytes()).map_err(|e| TextballError::io(target, e))?;
    Ok(textball)
}

/// Render a relative path as the slash separated string stored in a section
/// header, refusing anything that would not read back as the same path.
pub(crate) fn relative_path_string(path: &Path) -> Result<String> {
    let err = |reason| TextballError::PathEncoding {
        path: path.to_path_buf(),
        reason,
    };

    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                parts.push(part.to_str().ok_or_else(|| err("not valid UTF-8"))?);
            }
            Component::CurDir => continue,
            _ => return Err(err("not a plain relative path")),
        }
    }
    if parts.is_empty() {
        return Err(err("empty path"));
    }

    let encoded = parts.join("/");
    if encoded.contains('\n') {
        return Err(err("new line characters not allowed in file names"));
    }
    if encoded.starts_with(EXECUTABLE_MARKER) {
        return Err(err("path starts with the executable marker"));
    }
    if !Path::new(&encoded).components().eq(path.components().filter(|c| *c != Component::CurDir)) {
        return Err(err("could not encode<->decode relative path as string"));
    }
    Ok(encoded)
}

/// Text sections are stored verbatim, so the text must not contain a marker,
/// not even one completed by the blank line in front of the content.
fn check_magic_collision(path: &Path, text: &str) -> Result<()> {
    for marker in MARKERS {
        if text.contains(marker)
            || text.starts_with(&marker[1..])
            || text.starts_with(&marker[PATH_TERMINATOR.len()..])
        {
            return Err(TextballError::MagicCollision {
                path: path.to_path_buf(),
                marker,
            });
        }
    }
    Ok(())
}
