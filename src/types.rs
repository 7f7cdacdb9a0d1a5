use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A node of a navigable project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Folder(FolderNode),
    File(FileNode),
}

/// A folder and its ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// Display name, already converted to canonical text.
    pub name: String,
    /// On-disk location. `None` for synthetic folders such as group roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

/// A file leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Display name, already converted to canonical text.
    pub name: String,
    /// Absolute on-disk location.
    pub path: PathBuf,
    /// Lowercase extension including the leading dot, or empty.
    pub extension: String,
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => &folder.name,
            TreeNode::File(file) => &file.name,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            TreeNode::Folder(folder) => folder.path.as_deref(),
            TreeNode::File(file) => Some(&file.path),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder(_))
    }

    /// Children of a folder; files have none.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Folder(folder) => &folder.children,
            TreeNode::File(_) => &[],
        }
    }

    /// Number of file leaves in this subtree.
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::Folder(folder) => folder.children.iter().map(TreeNode::file_count).sum(),
            TreeNode::File(_) => 1,
        }
    }

    /// Depth-first iterator over the file leaves of this subtree.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                match node {
                    TreeNode::File(file) => return Some(file),
                    TreeNode::Folder(folder) => stack.extend(folder.children.iter().rev()),
                }
            }
            None
        })
    }
}

impl FolderNode {
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
            children: Vec::new(),
        }
    }
}

impl FileNode {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let extension = lowercase_extension(Path::new(&name));
        Self {
            name,
            path: path.into(),
            extension,
        }
    }
}

/// Lowercase extension with its leading dot; empty for names like `Makefile`
/// or `.gitignore`.
pub(crate) fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// A named group of files declared by the project description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Display name.
    pub name: String,
    /// The name in the configured legacy encoding, as a byte-preserving string.
    pub original_name: String,
    /// Extension filter exactly as written, e.g. `cpp;c;cxx`.
    pub filter: String,
    /// Synthetic folder (no path) holding the member files, laid out by
    /// their directories relative to the project.
    pub root: FolderNode,
}

/// Bucket for files declared outside of any group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Source,
    Header,
    Resource,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 4] = [
        FileCategory::Source,
        FileCategory::Header,
        FileCategory::Resource,
        FileCategory::Other,
    ];

    /// Classifies a lowercase extension such as `.cpp`.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            ".c" | ".cpp" | ".cxx" => FileCategory::Source,
            ".h" | ".hpp" | ".hxx" => FileCategory::Header,
            ".rc" | ".ico" | ".bmp" | ".cur" => FileCategory::Resource,
            _ => FileCategory::Other,
        }
    }

    /// Title the legacy IDE uses for this bucket.
    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Source => "Source Files",
            FileCategory::Header => "Header Files",
            FileCategory::Resource => "Resource Files",
            FileCategory::Other => "Other Files",
        }
    }
}

/// Everything known about one parsed project description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    /// File stem of the description.
    pub name: String,
    /// Location of the description.
    pub path: PathBuf,
    /// `Name="..."` from the description header, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_name: Option<String>,
    /// First `# TARGTYPE` of the description, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    pub groups: Vec<Group>,
    pub source_files: Vec<TreeNode>,
    pub header_files: Vec<TreeNode>,
    pub resource_files: Vec<TreeNode>,
    pub other_files: Vec<TreeNode>,
}

impl ProjectModel {
    /// A project with no groups or files, named after `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            declared_name: None,
            target_type: None,
            groups: Vec::new(),
            source_files: Vec::new(),
            header_files: Vec::new(),
            resource_files: Vec::new(),
            other_files: Vec::new(),
        }
    }

    pub fn files_in(&self, category: FileCategory) -> &[TreeNode] {
        match category {
            FileCategory::Source => &self.source_files,
            FileCategory::Header => &self.header_files,
            FileCategory::Resource => &self.resource_files,
            FileCategory::Other => &self.other_files,
        }
    }

    /// True when no group and no bucket holds anything.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
            && FileCategory::ALL
                .iter()
                .all(|&category| self.files_in(category).is_empty())
    }

    /// Every file leaf of the project, groups first, then the buckets.
    pub fn all_files(&self) -> impl Iterator<Item = &FileNode> + '_ {
        let grouped = self
            .groups
            .iter()
            .flat_map(|group| group.root.children.iter().flat_map(TreeNode::files));
        let loose = FileCategory::ALL
            .into_iter()
            .flat_map(|category| self.files_in(category).iter().flat_map(TreeNode::files));
        grouped.chain(loose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_extensions() {
        assert_eq!(FileCategory::from_extension(".cxx"), FileCategory::Source);
        assert_eq!(FileCategory::from_extension(".hpp"), FileCategory::Header);
        assert_eq!(FileCategory::from_extension(".cur"), FileCategory::Resource);
        assert_eq!(FileCategory::from_extension(".def"), FileCategory::Other);
        assert_eq!(FileCategory::from_extension(""), FileCategory::Other);
    }

    #[test]
    fn file_node_lowercases_extension() {
        let node = FileNode::new("Main.CPP", "/proj/Main.CPP");
        assert_eq!(node.extension, ".cpp");
        assert_eq!(FileNode::new("Makefile", "/proj/Makefile").extension, "");
        assert_eq!(FileNode::new(".gitignore", "/proj/.gitignore").extension, "");
    }

    #[test]
    fn serializes_with_type_tag() {
        let node = TreeNode::Folder(FolderNode {
            name: "src".into(),
            path: None,
            children: vec![TreeNode::File(FileNode::new("a.c", "/p/src/a.c"))],
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("path").is_none());
        assert_eq!(json["children"][0]["type"], "file");
        assert_eq!(json["children"][0]["extension"], ".c");
    }

    #[test]
    fn files_iterates_depth_first_in_order() {
        let node = TreeNode::Folder(FolderNode {
            name: "root".into(),
            path: None,
            children: vec![
                TreeNode::Folder(FolderNode {
                    name: "a".into(),
                    path: None,
                    children: vec![TreeNode::File(FileNode::new("x.c", "/a/x.c"))],
                }),
                TreeNode::File(FileNode::new("y.c", "/y.c")),
            ],
        });
        let names: Vec<_> = node.files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["x.c", "y.c"]);
        assert_eq!(node.file_count(), 2);
    }

    #[test]
    fn empty_project_uses_file_stem() {
        let model = ProjectModel::empty("/work/Hello.dsp");
        assert_eq!(model.name, "Hello");
        assert!(model.is_empty());
    }
}
