//! String substitution over entry streams, used to instantiate skeleton trees

use std::path::{Component, Path, PathBuf};

use crate::archive::{Content, Overrides, VirtualFile};
use crate::error::Result;

/// A sorted set of (placeholder, replacement) pairs.
///
/// Pairs are applied one after the other in sorted order, each to the result
/// of the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    pairs: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair. Empty placeholders are ignored.
    pub fn with(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.insert(from, to);
        self
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        if from.is_empty() {
            return;
        }
        self.pairs.push((from, to.into()));
        self.pairs.sort();
        self.pairs.dedup();
    }

    /// Add `placeholder -> name` together with its upper- and lower-case
    /// spellings, e.g. `SkeletonSP`, `SKELETONSP` and `skeletonsp`.
    pub fn with_case_variants(self, placeholder: &str, name: &str) -> Self {
        self.with(placeholder, name)
            .with(placeholder.to_uppercase(), name.to_uppercase())
            .with(placeholder.to_lowercase(), name.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (from, to) in &self.pairs {
            if out.contains(from.as_str()) {
                out = out.replace(from.as_str(), to);
            }
        }
        out
    }

    /// Substitute inside each path component separately. Components that are
    /// not valid UTF-8 are kept as they are.
    pub fn apply_path(&self, path: &Path) -> PathBuf {
        path.components()
            .map(|component| match component {
                Component::Normal(part) => match part.to_str() {
                    Some(part) => PathBuf::from(self.apply(part)),
                    None => PathBuf::from(part),
                },
                other => PathBuf::from(other.as_os_str()),
            })
            .collect()
    }

    /// Substitute in the path and, for text files, the content. Binary
    /// content and directories only get their path rewritten.
    pub fn apply_to(&self, vfile: &VirtualFile) -> Result<VirtualFile> {
        let overrides = Overrides::new().path(self.apply_path(vfile.path()));
        let overrides = match vfile.content() {
            Some(Content::Text(text)) => overrides.content(self.apply(text)),
            _ => overrides,
        };
        vfile.with_overrides(overrides)
    }

    /// Wrap an entry stream so every entry passes through [`Self::apply_to`]
    pub fn entries<I>(self, entries: I) -> SubstitutedEntries<I::IntoIter>
    where
        I: IntoIterator<Item = Result<VirtualFile>>,
    {
        SubstitutedEntries {
            inner: entries.into_iter(),
            substitutions: self,
        }
    }
}

/// Iterator returned by [`Substitutions::entries`]
#[derive(Debug)]
pub struct SubstitutedEntries<I> {
    inner: I,
    substitutions: Substitutions,
}

impl<I> Iterator for SubstitutedEntries<I>
where
    I: Iterator<Item = Result<VirtualFile>>,
{
    type Item = Result<VirtualFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let vfile = self.inner.next()?;
        Some(vfile.and_then(|vfile| self.substitutions.apply_to(&vfile)))
    }
}
