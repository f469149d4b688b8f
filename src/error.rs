//! Error types shared by the encoder, decoder and unpacker

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TextballError>;

#[derive(Debug, Error)]
pub enum TextballError {
    /// A [`VirtualFile`](crate::VirtualFile) violates the directory/content invariant
    #[error("Invalid entry {path:?}: {reason}")]
    InvalidEntry { path: PathBuf, reason: &'static str },

    /// Path is not UTF-8, contains a newline, or does not survive a string round trip
    #[error("Can not encode path {path:?} in textball: {reason}")]
    PathEncoding { path: PathBuf, reason: &'static str },

    /// Text content contains one of the section markers, which can not be escaped
    #[error("Magic line {marker:?} encountered in text file {path:?}")]
    MagicCollision { path: PathBuf, marker: &'static str },

    #[error("Invalid textball data at offset {offset}: {reason}")]
    Format { offset: usize, reason: &'static str },

    #[error("Invalid binary section for {path:?}: {reason}")]
    InvalidBinary { path: PathBuf, reason: String },

    #[error("Refusing to write entry with unsafe path {path:?}")]
    UnsafePath { path: PathBuf },

    #[error("File already exists: {path:?}")]
    Collision { path: PathBuf },

    #[error("Bad target directory {path:?}: {reason}")]
    DirectoryState { path: PathBuf, reason: &'static str },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TextballError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TextballError::Io {
            path: path.into(),
            source,
        }
    }

    /// Path of the file or directory the error is about, when there is one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            TextballError::InvalidEntry { path, .. }
            | TextballError::PathEncoding { path, .. }
            | TextballError::MagicCollision { path, .. }
            | TextballError::InvalidBinary { path, .. }
            | TextballError::UnsafePath { path }
            | TextballError::Collision { path }
            | TextballError::DirectoryState { path, .. }
            | TextballError::Io { path, .. } => Some(path),
            TextballError::Format { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_path() {
        let err = TextballError::Collision {
            path: PathBuf::from("out/a.txt"),
        };
        assert!(err.to_string().contains("out/a.txt"));
        assert_eq!(err.path(), Some(std::path::Path::new("out/a.txt")));
    }

    #[test]
    fn test_format_error_has_offset() {
        let err = TextballError::Format {
            offset: 42,
            reason: "missing header",
        };
        assert!(err.to_string().contains("offset 42"));
        assert!(err.path().is_none());
    }
}
