//! # dsptree
//!
//! `dsptree` turns legacy Visual C++ 6 project descriptions (`.dsp` files) into
//! normalized file/folder trees ready for display, and can build the same tree
//! shape straight from a directory on disk.
//!
//! Names stored in a legacy code page (CP949, EUC-KR, Shift-JIS, ...) are
//! converted to display text using the [`TextEncoding`] passed to each call;
//! nothing is read from global settings.
//!
//! None of the entry points fail. Each returns an [`Outcome`]: the value is
//! always usable (possibly empty), and `diagnostics` lists anything that went
//! wrong along the way.
//!
//! # Example
//!
//! ```no_run
//! use dsptree::{TextEncoding, parse_project_file};
//!
//! let outcome = parse_project_file("Hello.dsp", TextEncoding::Cp949);
//! for problem in &outcome.diagnostics {
//!     eprintln!("warning: {problem}");
//! }
//! let project = outcome.into_value();
//! for group in &project.groups {
//!     println!("{} ({} files)", group.name, group.root.children.len());
//! }
//! ```

pub mod encoding;
mod error;
mod options;
pub mod output;
mod parser;
mod scanner;
mod tree;
mod types;

pub use encoding::{TextEncoding, convert};
pub use error::{DspTreeError, Outcome};
pub use options::{ScanBuilder, ScanOptions};
pub use parser::{parse_project_file, parse_project_text};
pub use scanner::{scan, scan_directory};
pub use tree::{build_tree, compare_nodes, normalize_lexically, sort_nodes};
pub use types::{FileCategory, FileNode, FolderNode, Group, ProjectModel, TreeNode};
