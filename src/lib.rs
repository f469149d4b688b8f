//! # textball
//!
//! Textballs are a simple alternative to tar-balls that is better suited for
//! being committed to a git repository: a whole directory tree is stored in
//! one UTF-8 text document, text files appear verbatim, and editing a file
//! inside the textball gives a small, readable diff.
//!
//! ## Format
//!
//! ```text
//! @TEXTBALL_v1@
//!
//!
//! #~~~textfile~~~>>> README.md
//!
//! # Project
//!
//!
//! #~~~binaryfile~~~>>> ~executable~ bin/tool
//!
//! !!3*
//! ```
//!
//! - The document starts with the header line `@TEXTBALL_v1@`.
//! - Each file is a section introduced by a marker, `\n\n#~~~textfile~~~>>> `
//!   or `\n\n#~~~binaryfile~~~>>> `, followed by an optional `~executable~ `
//!   tag, the relative path, a blank line and the content.
//! - Content runs up to the next marker or the end of the document.
//! - Text files (valid UTF-8) are stored as they are, newlines included.
//!   Anything else is ascii85 encoded, wrapped at 80 columns.
//!
//! There is no escaping: a text file containing a marker can not be stored
//! and is rejected with [`TextballError::MagicCollision`]. Directories are not
//! stored, so empty directories do not survive a round trip.
//!
//! ## Usage
//!
//! ```no_run
//! use textball::{create_textball, unpack_textball, CreateOptions, UnpackOptions};
//!
//! let doc = create_textball("skeleton", &CreateOptions::default())?;
//! unpack_textball(&doc, "copy_of_skeleton", &UnpackOptions::default())?;
//! # Ok::<(), textball::TextballError>(())
//! ```

pub mod archive;
pub mod ascii85;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod transform;
pub mod tree;
pub mod unpack;

pub use archive::{Content, Overrides, VirtualFile};
pub use decoder::{decode, TextballIter};
pub use encoder::{create_textball, create_textball_file, encode_entries, CreateOptions, Encoder};
pub use error::{Result, TextballError};
pub use transform::{SubstitutedEntries, Substitutions};
pub use tree::{exclude_spurious_files, path_to_vfile, tree_entries, PathFilter};
pub use unpack::{unpack_textball, unpack_textball_file, write_entries_to_directory, UnpackOptions};
