//! Textball decoder

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{
    Content, VirtualFile, BINARY_MARKER, EXECUTABLE_MARKER, HEADER, MAGIC_COMMON,
    PATH_TERMINATOR, TEXT_MARKER,
};
use crate::ascii85;
use crate::error::{Result, TextballError};

/// Location of one section inside the document
#[derive(Debug, Clone, Copy)]
struct Section {
    marker_start: usize,
    path_start: usize,
    is_binary: bool,
}

/// Lazy, forward-only iterator over the entries of a textball.
///
/// The document is scanned for section markers one section ahead of the
/// entry being yielded; the content of an entry is only copied out of the
/// document when that entry is produced. After the first error the
/// iterator is exhausted.
///
/// ```
/// use textball::TextballIter;
///
/// let doc = "@TEXTBALL_v1@\n\n\n#~~~textfile~~~>>> a.txt\n\nhello\n";
/// let entries: Vec<_> = TextballIter::new(doc).unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].path(), std::path::Path::new("a.txt"));
/// ```
#[derive(Debug)]
pub struct TextballIter<'a> {
    data: Cow<'a, str>,
    search_start: usize,
    next_section: Option<Section>,
    failed: bool,
}

impl<'a> TextballIter<'a> {
    /// Iterate over a textball held in memory
    pub fn new(data: &'a str) -> Result<Self> {
        Self::from_cow(Cow::Borrowed(data))
    }

    /// Iterate over a textball, taking ownership of the document
    pub fn from_string(data: String) -> Result<TextballIter<'static>> {
        TextballIter::from_cow(Cow::Owned(data))
    }

    /// Read a textball file. The bytes are decoded as UTF-8 as they are,
    /// so DOS and unix newlines inside text files survive.
    pub fn from_path(path: impl AsRef<Path>) -> Result<TextballIter<'static>> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| TextballError::io(path, e))?;
        let data = String::from_utf8(bytes).map_err(|e| TextballError::Format {
            offset: e.utf8_error().valid_up_to(),
            reason: "textball is not valid UTF-8",
        })?;
        TextballIter::from_string(data)
    }

    fn from_cow(data: Cow<'a, str>) -> Result<Self> {
        if !data.starts_with(HEADER) {
            return Err(TextballError::Format {
                offset: 0,
                reason: "missing textball header",
            });
        }
        let mut iter = Self {
            data,
            search_start: HEADER.len(),
            next_section: None,
            failed: false,
        };
        iter.next_section = iter.find_next_section();
        Ok(iter)
    }

    /// Locate the earliest marker at or after the search cursor and move the
    /// cursor past it
    fn find_next_section(&mut self) -> Option<Section> {
        let data = &*self.data;
        let mut from = self.search_start;
        loop {
            let marker_start = from + data.get(from..)?.find(MAGIC_COMMON)?;
            let rest = &data[marker_start..];
            let found = if rest.starts_with(TEXT_MARKER) {
                Some((TEXT_MARKER, false))
            } else if rest.starts_with(BINARY_MARKER) {
                Some((BINARY_MARKER, true))
            } else {
                None
            };
            match found {
                Some((marker, is_binary)) => {
                    let path_start = marker_start + marker.len();
                    self.search_start = path_start;
                    return Some(Section {
                        marker_start,
                        path_start,
                        is_binary,
                    });
                }
                // MAGIC_COMMON starts with a newline, so this is a char boundary
                None => from = marker_start + 1,
            }
        }
    }

    fn read_section(&self, section: Section, section_end: usize) -> Result<VirtualFile> {
        let data = &*self.data;
        let path_end = data[section.path_start..section_end]
            .find(PATH_TERMINATOR)
            .map(|i| section.path_start + i)
            .ok_or(TextballError::Format {
                offset: section.path_start,
                reason: "path line is not followed by a blank line",
            })?;

        let path_line = &data[section.path_start..path_end];
        let (path, executable) = match path_line.strip_prefix(EXECUTABLE_MARKER) {
            Some(path) => (path, true),
            None => (path_line, false),
        };
        if path.is_empty() {
            return Err(TextballError::Format {
                offset: section.path_start,
                reason: "empty file path",
            });
        }

        let body = &data[path_end + PATH_TERMINATOR.len()..section_end];
        let content = if section.is_binary {
            let decoded = ascii85::decode(body).map_err(|e| TextballError::InvalidBinary {
                path: PathBuf::from(path),
                reason: e.to_string(),
            })?;
            Content::Binary(decoded)
        } else {
            Content::Text(body.to_string())
        };
        Ok(VirtualFile::file(path, content, executable))
    }
}

impl Iterator for TextballIter<'_> {
    type Item = Result<VirtualFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let section = self.next_section.take()?;
        self.next_section = self.find_next_section();
        let section_end = self
            .next_section
            .map_or(self.data.len(), |next| next.marker_start);

        let result = self.read_section(section, section_end);
        if result.is_err() {
            self.failed = true;
            self.next_section = None;
        }
        Some(result)
    }
}

/// Decode a whole textball into memory
pub fn decode(data: &str) -> Result<Vec<VirtualFile>> {
    TextballIter::new(data)?.collect()
}
