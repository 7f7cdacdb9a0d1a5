use crate::encoding::TextEncoding;
use crate::error::{DspTreeError, Outcome};
use crate::options::{ScanBuilder, ScanOptions, normalize_extension};
use crate::tree::TreeAssembler;
use crate::types::{TreeNode, lowercase_extension};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, warn};

struct Walker {
    inner: ignore::Walk,
}

impl Walker {
    fn new(options: &ScanOptions, outcome: &mut Outcome<()>) -> Self {
        let mut builder = WalkBuilder::new(&options.root);
        builder
            .git_ignore(options.respect_gitignore)
            .git_global(options.respect_gitignore)
            .git_exclude(options.respect_gitignore)
            .parents(options.respect_gitignore)
            .hidden(!options.include_hidden)
            .max_depth(options.max_depth)
            .follow_links(options.follow_links)
            .ignore(false);
        if let Some(matcher) = build_matcher(&options.ignore_patterns, outcome) {
            builder.filter_entry(move |entry| !matcher.is_match(entry.path()));
        }
        Self {
            inner: builder.build(),
        }
    }
}

// Invalid patterns are reported and left out; the rest still apply.
fn build_matcher(patterns: &[String], outcome: &mut Outcome<()>) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut glob_builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                glob_builder.add(glob);
            }
            Err(e) => {
                warn!(%pattern, error = %e, "ignoring invalid glob pattern");
                outcome.push(DspTreeError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    match glob_builder.build() {
        Ok(set) if !set.is_empty() => Some(set),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "cannot build glob set, scanning without ignore patterns");
            outcome.push(DspTreeError::InvalidPattern {
                pattern: patterns.join(", "),
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Walks `options.root` and returns its contents as a sorted tree.
///
/// Files are kept when `show_all_files` is set or their extension is listed
/// in `extensions`; folders are kept only when something below them is,
/// unless `show_all_files` is set. Unreadable entries are logged, recorded
/// as [`DspTreeError::Walk`] and skipped.
pub fn scan(options: &ScanOptions) -> Outcome<Vec<TreeNode>> {
    debug!(root = %options.root.display(), encoding = %options.encoding, "scanning directory");
    let mut outcome = Outcome::clean(());
    let extensions: HashSet<String> = options
        .extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect();
    let walker = Walker::new(options, &mut outcome);
    let mut assembler = TreeAssembler::new(&options.root, options.encoding);

    for result in walker.inner {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "cannot read directory entry, skipping");
                outcome.push(DspTreeError::Walk(e.to_string()));
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&options.root) else {
            continue;
        };
        let segments: Vec<OsString> = relative
            .components()
            .map(|c| c.as_os_str().to_os_string())
            .collect();

        if is_directory(&entry) {
            assembler.add_folder(&segments);
        } else if options.show_all_files
            || extensions.contains(&lowercase_extension(entry.path()))
        {
            assembler.add_file(&segments, entry.path().to_path_buf());
        }
    }

    let tree = outcome.absorb(assembler.finish(options.show_all_files));
    outcome.map(|()| tree)
}

// Unfollowed links report a symlink file type; ask the target instead.
fn is_directory(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
        || (entry.path_is_symlink() && entry.path().is_dir())
}

/// Scans `dir` with the default walker settings.
pub fn scan_directory(
    dir: impl AsRef<Path>,
    extensions: &[&str],
    show_all_files: bool,
    encoding: TextEncoding,
) -> Outcome<Vec<TreeNode>> {
    let options = ScanBuilder::new(dir.as_ref())
        .extensions(extensions)
        .show_all_files(show_all_files)
        .encoding(encoding)
        .build();
    scan(&options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(TreeNode::name).collect()
    }

    #[test]
    fn empty_extension_entries_match_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Makefile"), "").unwrap();
        fs::write(dir.path().join("main.cpp"), "").unwrap();

        let options = ScanOptions {
            root: dir.path().to_path_buf(),
            extensions: vec![String::new(), " ".into(), "CPP".into()],
            ..Default::default()
        };
        let tree = scan(&options).into_value();
        assert_eq!(names(&tree), ["main.cpp"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_a_folder() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/x.cpp"), "").unwrap();
        fs::write(outside.path().join("y.cpp"), "").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();

        let tree = scan_directory(dir.path(), &[".cpp"], false, TextEncoding::Utf8).into_value();
        assert_eq!(names(&tree), ["linked", "real"]);
        assert!(tree[0].is_folder());
        assert_eq!(names(tree[0].children()), ["y.cpp"]);
        assert_eq!(
            tree[0].children()[0].path(),
            Some(dir.path().join("linked/y.cpp").as_path())
        );

        let options = ScanBuilder::new(dir.path())
            .show_all_files(true)
            .follow_links(false)
            .build();
        let tree = scan(&options).into_value();
        assert_eq!(names(&tree), ["linked", "real"]);
        assert!(tree[0].is_folder());
        assert!(tree[0].children().is_empty());
    }
}
