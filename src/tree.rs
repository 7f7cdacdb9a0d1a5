//! Building nested folder trees from flat path lists, and ordering them.

use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::encoding::{TextEncoding, display_name};
use crate::error::Outcome;
use crate::types::{FileNode, FolderNode, TreeNode};

/// Rebuilds the folder hierarchy implied by `paths` below `root`.
///
/// Folders are created from path components alone and merged by display
/// name, so two raw names that decode to the same text share one folder.
/// Paths outside `root` hang under `..` folders. The result is sorted with
/// [`sort_nodes`].
pub fn build_tree(paths: &[PathBuf], root: &Path, encoding: TextEncoding) -> Outcome<Vec<TreeNode>> {
    let mut assembler = TreeAssembler::new(root, encoding);
    for path in paths {
        let segments = relative_components(path, root);
        if segments.is_empty() {
            debug!(path = %path.display(), "skipping path that names the tree root");
            continue;
        }
        assembler.add_file(&segments, path.clone());
    }
    assembler.finish(false)
}

/// Orders every level of the tree: folders before files, then by name.
pub fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(compare_nodes);
    for node in nodes.iter_mut() {
        if let TreeNode::Folder(folder) = node {
            sort_nodes(&mut folder.children);
        }
    }
}

/// The ordering applied by [`sort_nodes`] to siblings.
pub fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a, b) {
        (TreeNode::Folder(_), TreeNode::File(_)) => Ordering::Less,
        (TreeNode::File(_), TreeNode::Folder(_)) => Ordering::Greater,
        _ => compare_names(a.name(), b.name()),
    }
}

// Case-insensitive first; among names differing only in case, lowercase wins.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

/// Resolves `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}

/// Components of `path` relative to `root`, with `..` for every level
/// `path` lies outside of `root`.
pub(crate) fn relative_components(path: &Path, root: &Path) -> Vec<OsString> {
    let path = normalize_lexically(path);
    let root = normalize_lexically(root);
    let path: Vec<Component<'_>> = path.components().filter(|c| *c != Component::CurDir).collect();
    let root: Vec<Component<'_>> = root.components().filter(|c| *c != Component::CurDir).collect();
    let common = path
        .iter()
        .zip(&root)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<OsString> = (common..root.len()).map(|_| OsString::from("..")).collect();
    segments.extend(path[common..].iter().map(|c| c.as_os_str().to_os_string()));
    segments
}

/// Incrementally assembles a tree below a root directory.
pub(crate) struct TreeAssembler {
    encoding: TextEncoding,
    root: PendingFolder,
    outcome: Outcome<()>,
}

struct PendingFolder {
    name: String,
    path: PathBuf,
    folders: Vec<PendingFolder>,
    files: Vec<FileNode>,
}

impl PendingFolder {
    fn new(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            folders: Vec::new(),
            files: Vec::new(),
        }
    }

    fn into_node(self, keep_empty: bool) -> Option<TreeNode> {
        let PendingFolder {
            name,
            path,
            folders,
            files,
        } = self;
        let children = collect_children(folders, files, keep_empty);
        if children.is_empty() && !keep_empty {
            debug!(folder = %path.display(), "pruning empty folder");
            return None;
        }
        Some(TreeNode::Folder(FolderNode {
            name,
            path: Some(path),
            children,
        }))
    }
}

fn collect_children(folders: Vec<PendingFolder>, files: Vec<FileNode>, keep_empty: bool) -> Vec<TreeNode> {
    let mut children: Vec<TreeNode> = folders
        .into_iter()
        .filter_map(|folder| folder.into_node(keep_empty))
        .collect();
    children.extend(files.into_iter().map(TreeNode::File));
    children
}

fn descend<'a>(
    mut folder: &'a mut PendingFolder,
    segments: &[OsString],
    encoding: TextEncoding,
    outcome: &mut Outcome<()>,
) -> &'a mut PendingFolder {
    for segment in segments {
        let name = outcome.absorb(display_name(segment, encoding));
        let index = match folder.folders.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => {
                let path = normalize_lexically(&folder.path.join(segment));
                folder.folders.push(PendingFolder::new(name, path));
                folder.folders.len() - 1
            }
        };
        folder = &mut folder.folders[index];
    }
    folder
}

impl TreeAssembler {
    pub(crate) fn new(root: &Path, encoding: TextEncoding) -> Self {
        Self {
            encoding,
            root: PendingFolder::new(String::new(), root.to_path_buf()),
            outcome: Outcome::clean(()),
        }
    }

    /// Makes sure the folder chain named by `segments` exists.
    pub(crate) fn add_folder(&mut self, segments: &[OsString]) {
        descend(&mut self.root, segments, self.encoding, &mut self.outcome);
    }

    /// Adds a file whose last segment is its own name.
    pub(crate) fn add_file(&mut self, segments: &[OsString], path: PathBuf) {
        let Some((file_name, folders)) = segments.split_last() else {
            return;
        };
        let name = self.outcome.absorb(display_name(file_name, self.encoding));
        let folder = descend(&mut self.root, folders, self.encoding, &mut self.outcome);
        folder.files.push(FileNode::new(name, path));
    }

    /// Produces the sorted children of the root. Folders left without
    /// children are dropped unless `keep_empty_folders` is set.
    pub(crate) fn finish(self, keep_empty_folders: bool) -> Outcome<Vec<TreeNode>> {
        let PendingFolder { folders, files, .. } = self.root;
        let mut children = collect_children(folders, files, keep_empty_folders);
        sort_nodes(&mut children);
        self.outcome.map(|()| children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str, children: Vec<TreeNode>) -> TreeNode {
        TreeNode::Folder(FolderNode {
            name: name.into(),
            path: None,
            children,
        })
    }

    fn file(name: &str) -> TreeNode {
        TreeNode::File(FileNode::new(name, format!("/p/{name}")))
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(TreeNode::name).collect()
    }

    #[test]
    fn folders_sort_before_files_then_by_name() {
        let mut nodes = vec![folder("Z", vec![]), file("A"), folder("A", vec![])];
        sort_nodes(&mut nodes);
        assert_eq!(names(&nodes), ["A", "Z", "A"]);
        assert!(nodes[0].is_folder() && nodes[1].is_folder());
        assert!(!nodes[2].is_folder());
    }

    #[test]
    fn sort_ignores_case_and_recurses() {
        let mut nodes = vec![folder(
            "root",
            vec![file("beta.c"), file("Alpha.c"), file("alpha.c"), folder("sub", vec![])],
        )];
        sort_nodes(&mut nodes);
        assert_eq!(names(nodes[0].children()), ["sub", "alpha.c", "Alpha.c", "beta.c"]);
    }

    #[test]
    fn build_merges_shared_prefixes() {
        let paths = vec![PathBuf::from("/r/a/b/x.c"), PathBuf::from("/r/a/b/y.c")];
        let tree = build_tree(&paths, Path::new("/r"), TextEncoding::Utf8).into_value();
        assert_eq!(names(&tree), ["a"]);
        let a = &tree[0];
        assert_eq!(a.path(), Some(Path::new("/r/a")));
        assert_eq!(names(a.children()), ["b"]);
        let b = &a.children()[0];
        assert_eq!(b.path(), Some(Path::new("/r/a/b")));
        assert_eq!(names(b.children()), ["x.c", "y.c"]);
    }

    #[test]
    fn build_places_outside_paths_under_parent_folders() {
        let paths = vec![
            PathBuf::from("/r/proj/main.cpp"),
            PathBuf::from("/r/common/util.h"),
        ];
        let tree = build_tree(&paths, Path::new("/r/proj"), TextEncoding::Utf8).into_value();
        assert_eq!(names(&tree), ["..", "main.cpp"]);
        let up = &tree[0];
        assert_eq!(up.path(), Some(Path::new("/r")));
        assert_eq!(names(up.children()), ["common"]);
        assert_eq!(up.children()[0].children()[0].path(), Some(Path::new("/r/common/util.h")));
    }

    #[test]
    fn build_is_idempotent_under_sort() {
        let paths = vec![
            PathBuf::from("/r/z.c"),
            PathBuf::from("/r/lib/b.c"),
            PathBuf::from("/r/Lib2/a.c"),
            PathBuf::from("/r/a.h"),
        ];
        let tree = build_tree(&paths, Path::new("/r"), TextEncoding::Utf8).into_value();
        let mut resorted = tree.clone();
        sort_nodes(&mut resorted);
        assert_eq!(tree, resorted);
    }

    #[test]
    fn assembler_prunes_empty_folders_unless_asked() {
        let mut assembler = TreeAssembler::new(Path::new("/r"), TextEncoding::Utf8);
        assembler.add_folder(&[OsString::from("empty")]);
        assert!(assembler.finish(false).into_value().is_empty());

        let mut assembler = TreeAssembler::new(Path::new("/r"), TextEncoding::Utf8);
        assembler.add_folder(&[OsString::from("empty")]);
        let kept = assembler.finish(true).into_value();
        assert_eq!(names(&kept), ["empty"]);
        assert!(kept[0].children().is_empty());
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_lexically(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn relative_components_walks_up_and_down() {
        let segments = relative_components(Path::new("/a/x/y.c"), Path::new("/a/b/c"));
        assert_eq!(segments, ["..", "..", "x", "y.c"].map(OsString::from));
        assert!(relative_components(Path::new("/a/b"), Path::new("/a/b/")).is_empty());
    }
}
