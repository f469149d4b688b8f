//! Textball format constants and the in-memory entry model

use std::path::{Path, PathBuf};

use crate::error::{Result, TextballError};

// Textball format constants
pub const HEADER: &str = "@TEXTBALL_v1@\n";
/// Shared prefix of both section markers. `~` never occurs in ascii85 output.
pub const MAGIC_COMMON: &str = "\n\n#~~~";
pub const TEXT_MARKER: &str = "\n\n#~~~textfile~~~>>> ";
pub const BINARY_MARKER: &str = "\n\n#~~~binaryfile~~~>>> ";
pub const EXECUTABLE_MARKER: &str = "~executable~ ";
/// Separates the path line from the section content
pub const PATH_TERMINATOR: &str = "\n\n";
pub const BINARY_WRAP_COLUMN: usize = 80;

/// Both section markers, in the order they are checked
pub const MARKERS: [&str; 2] = [TEXT_MARKER, BINARY_MARKER];

/// Content of a file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Valid UTF-8, stored verbatim in a text section
    Text(String),
    /// Anything else, stored ascii85-encoded in a binary section
    Binary(Vec<u8>),
}

impl Content {
    /// Classify raw bytes: valid UTF-8 becomes text, everything else binary
    pub fn detect(data: Vec<u8>) -> Self {
        match String::from_utf8(data) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Binary(e.into_bytes()),
        }
    }

    /// True for content stored in a binary section
    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Binary(_))
    }

    /// Raw bytes, as written to disk
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(data) => data,
        }
    }

    /// The text, if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Binary(_) => None,
        }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(data: Vec<u8>) -> Self {
        Content::Binary(data)
    }
}

impl From<&[u8]> for Content {
    fn from(data: &[u8]) -> Self {
        Content::Binary(data.to_vec())
    }
}

/// One entry of a file set: a relative path plus content and flags.
///
/// Directories carry no content and are never executable. Entries are
/// immutable; use [`VirtualFile::with_overrides`] to derive a changed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    path: PathBuf,
    content: Option<Content>,
    executable: bool,
    is_dir: bool,
}

impl VirtualFile {
    /// Create an entry, checking the directory/content invariant
    pub fn new(
        path: impl Into<PathBuf>,
        content: Option<Content>,
        executable: bool,
        is_dir: bool,
    ) -> Result<Self> {
        let path = path.into();
        if is_dir {
            if content.is_some() {
                return Err(TextballError::InvalidEntry {
                    path,
                    reason: "directory entries can not have content",
                });
            }
            if executable {
                return Err(TextballError::InvalidEntry {
                    path,
                    reason: "directory entries can not be executable",
                });
            }
        } else if content.is_none() {
            return Err(TextballError::InvalidEntry {
                path,
                reason: "file entries must have content",
            });
        }
        Ok(Self {
            path,
            content,
            executable,
            is_dir,
        })
    }

    /// Create a file entry
    pub fn file(path: impl Into<PathBuf>, content: impl Into<Content>, executable: bool) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            executable,
            is_dir: false,
        }
    }

    /// Create a directory entry
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: None,
            executable: false,
            is_dir: true,
        }
    }

    /// Derive a new entry, replacing the fields set in `overrides`
    pub fn with_overrides(&self, overrides: Overrides) -> Result<Self> {
        Self::new(
            overrides.path.unwrap_or_else(|| self.path.clone()),
            overrides.content.unwrap_or_else(|| self.content.clone()),
            overrides.executable.unwrap_or(self.executable),
            overrides.is_dir.unwrap_or(self.is_dir),
        )
    }

    /// Relative path of the entry
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content, `None` for directories
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Whether the entry is marked executable
    pub fn executable(&self) -> bool {
        self.executable
    }

    /// Whether the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

/// Field replacements for [`VirtualFile::with_overrides`]. Unset fields keep
/// the value of the entry being modified.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    path: Option<PathBuf>,
    content: Option<Option<Content>>,
    executable: Option<bool>,
    is_dir: Option<bool>,
}

impl Overrides {
    /// Empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the content
    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(Some(content.into()));
        self
    }

    /// Drop the content, as needed when turning an entry into a directory
    pub fn no_content(mut self) -> Self {
        self.content = Some(None);
        self
    }

    /// Replace the executable flag
    pub fn executable(mut self, executable: bool) -> Self {
        self.executable = Some(executable);
        self
    }

    /// Replace the directory flag
    pub fn is_dir(mut self, is_dir: bool) -> Self {
        self.is_dir = Some(is_dir);
        self
    }
}
