use crate::encoding::TextEncoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for a directory scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub root: PathBuf,
    /// Lowercase extensions with their leading dot, e.g. `.cpp`.
    pub extensions: Vec<String>,
    /// Keep every file and every folder, including empty ones.
    pub show_all_files: bool,
    /// Encoding of on-disk names.
    pub encoding: TextEncoding,
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    /// Descend into symlinked directories. When off, a link to a directory
    /// still shows up as a folder, just without contents.
    pub follow_links: bool,
    pub max_depth: Option<usize>,
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: Vec::new(),
            show_all_files: false,
            encoding: TextEncoding::Utf8,
            respect_gitignore: false,
            include_hidden: true,
            follow_links: true,
            max_depth: None,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Normalizes `CPP` or `.Cpp` to `.cpp`.
pub(crate) fn normalize_extension(extension: &str) -> String {
    let lower = extension.trim().to_lowercase();
    if lower.is_empty() || lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

#[derive(Debug, Default)]
pub struct ScanBuilder {
    options: ScanOptions,
}

impl ScanBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: ScanOptions {
                root: root.into(),
                ..Default::default()
            },
        }
    }
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.options.extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }
    pub fn show_all_files(mut self, yes: bool) -> Self {
        self.options.show_all_files = yes;
        self
    }
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.options.encoding = encoding;
        self
    }
    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.options.respect_gitignore = yes;
        self
    }
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = Some(depth);
        self
    }
    pub fn no_limit_depth(mut self) -> Self {
        self.options.max_depth = None;
        self
    }
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.options.include_hidden = yes;
        self
    }
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.options.follow_links = yes;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn build(self) -> ScanOptions {
        self.options
    }
}
