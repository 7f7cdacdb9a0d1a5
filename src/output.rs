//! Output formatting for parsed projects and scanned trees.
//!
//! Provides functions to format a [`ProjectModel`] or a list of
//! [`TreeNode`]s as JSON, an ASCII tree, or a flat list of file paths.

use crate::error::DspTreeError;
use crate::types::{FileCategory, ProjectModel, TreeNode};
use std::fs;
use std::path::Path;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Tree,
    Paths,
}

/// Formats a parsed project.
pub fn format_project(
    model: &ProjectModel,
    format: OutputFormat,
    pretty: bool,
) -> Result<String, DspTreeError> {
    match format {
        OutputFormat::Json => to_json(model, pretty),
        OutputFormat::Tree => Ok(render_project(model)),
        OutputFormat::Paths => Ok(render_paths(model.all_files().map(|f| f.path.as_path()))),
    }
}

/// Formats the result of a directory scan.
pub fn format_nodes(
    nodes: &[TreeNode],
    format: OutputFormat,
    pretty: bool,
) -> Result<String, DspTreeError> {
    match format {
        OutputFormat::Json => to_json(nodes, pretty),
        OutputFormat::Tree => Ok(render_tree(nodes)),
        OutputFormat::Paths => Ok(render_paths(
            nodes.iter().flat_map(TreeNode::files).map(|f| f.path.as_path()),
        )),
    }
}

/// Writes already formatted output to a file.
pub fn write_to_file(content: &str, path: impl AsRef<Path>) -> Result<(), DspTreeError> {
    fs::write(&path, content).map_err(|e| DspTreeError::io(path.as_ref(), e))
}

/// Renders nodes the way the `tree` command does. Folders get a trailing `/`.
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(&mut out, "", nodes);
    out
}

// ----------------------- Internal formatting -----------------------

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, DspTreeError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn render_project(model: &ProjectModel) -> String {
    let mut out = format!("{}  # {}\n", model.name, model.path.display());

    let mut sections: Vec<(String, &[TreeNode])> = model
        .groups
        .iter()
        .map(|group| {
            let label = if group.filter.is_empty() {
                format!("{}/", group.name)
            } else {
                format!("{}/  [{}]", group.name, group.filter)
            };
            (label, group.root.children.as_slice())
        })
        .collect();
    for category in FileCategory::ALL {
        let files = model.files_in(category);
        if !files.is_empty() {
            sections.push((format!("{}/", category.label()), files));
        }
    }

    for (i, (label, children)) in sections.iter().enumerate() {
        render_entry(&mut out, "", label, children, i + 1 == sections.len());
    }
    out
}

fn render_level(out: &mut String, prefix: &str, nodes: &[TreeNode]) {
    for (i, node) in nodes.iter().enumerate() {
        let label = match node {
            TreeNode::Folder(folder) => format!("{}/", folder.name),
            TreeNode::File(file) => file.name.clone(),
        };
        render_entry(out, prefix, &label, node.children(), i + 1 == nodes.len());
    }
}

fn render_entry(out: &mut String, prefix: &str, label: &str, children: &[TreeNode], last: bool) {
    let (branch, indent) = if last {
        ("└── ", "    ")
    } else {
        ("├── ", "│   ")
    };
    out.push_str(prefix);
    out.push_str(branch);
    out.push_str(label);
    out.push('\n');
    render_level(out, &format!("{prefix}{indent}"), children);
}

fn render_paths<'a>(paths: impl Iterator<Item = &'a Path>) -> String {
    let mut out = String::new();
    for path in paths {
        out.push_str(&path.display().to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileNode, FolderNode, Group};

    fn sample_nodes() -> Vec<TreeNode> {
        vec![
            TreeNode::Folder(FolderNode {
                name: "src".into(),
                path: Some("/p/src".into()),
                children: vec![
                    TreeNode::File(FileNode::new("a.c", "/p/src/a.c")),
                    TreeNode::File(FileNode::new("b.c", "/p/src/b.c")),
                ],
            }),
            TreeNode::File(FileNode::new("README", "/p/README")),
        ]
    }

    #[test]
    fn renders_ascii_tree() {
        let expected = "\
├── src/
│   ├── a.c
│   └── b.c
└── README
";
        assert_eq!(render_tree(&sample_nodes()), expected);
    }

    #[test]
    fn renders_paths_depth_first() {
        let out = format_nodes(&sample_nodes(), OutputFormat::Paths, false).unwrap();
        assert_eq!(out, "/p/src/a.c\n/p/src/b.c\n/p/README\n");
    }

    #[test]
    fn renders_project_sections() {
        let mut model = ProjectModel::empty("/p/App.dsp");
        model.groups.push(Group {
            name: "Source Files".into(),
            original_name: "Source Files".into(),
            filter: "cpp;c".into(),
            root: FolderNode {
                name: "Source Files".into(),
                path: None,
                children: sample_nodes(),
            },
        });
        model.other_files.push(TreeNode::File(FileNode::new("notes.txt", "/p/notes.txt")));

        let out = format_project(&model, OutputFormat::Tree, false).unwrap();
        assert!(out.starts_with("App  # /p/App.dsp\n├── Source Files/  [cpp;c]\n│   ├── src/\n"));
        assert!(out.ends_with("└── Other Files/\n    └── notes.txt\n"));
    }

    #[test]
    fn json_output_round_trips() {
        let model = ProjectModel::empty("/p/App.dsp");
        let json = format_project(&model, OutputFormat::Json, true).unwrap();
        let back: ProjectModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
