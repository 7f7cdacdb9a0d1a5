//! Reader for Visual C++ 6 project descriptions (`.dsp`).
//!
//! Only grouping and file membership are extracted. Build settings, custom
//! build steps and configuration blocks are skipped line by line.

use std::fs;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, warn};

use crate::encoding::{
    TextEncoding, binary_path, convert, decode_bytes, display_name, native_path,
};
use crate::error::{DspTreeError, Outcome};
use crate::tree::{build_tree, normalize_lexically};
use crate::types::{FileCategory, FolderNode, Group, ProjectModel, lowercase_extension};

static BEGIN_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^# Begin Group "([^"]+)""#).expect("valid group pattern"));
static DEFAULT_FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^# PROP Default_Filter "([^"]*)""#).expect("valid filter pattern")
});
static PROJECT_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^# Microsoft Developer Studio Project File - Name="([^"]*)""#)
        .expect("valid header pattern")
});
static TARGET_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^# TARGTYPE "([^"]+)""#).expect("valid target type pattern"));

const END_GROUP: &str = "# End Group";
const BEGIN_SOURCE_FILE: &str = "# Begin Source File";
const END_SOURCE_FILE: &str = "# End Source File";
const SOURCE_PREFIX: &str = "SOURCE=";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reads and parses the project description at `path`.
///
/// Never fails: an unreadable file yields [`ProjectModel::empty`] with an
/// [`DspTreeError::Io`] diagnostic. Relative `SOURCE=` entries resolve
/// against the directory holding the description.
///
/// Lines are decoded one at a time, so an invalid byte only degrades its own
/// line. Paths on such a line keep their raw bytes.
pub fn parse_project_file(path: impl AsRef<Path>, encoding: TextEncoding) -> Outcome<ProjectModel> {
    let path = path.as_ref();
    debug!(path = %path.display(), %encoding, "parsing project description");

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %path.display(), error = %e, "cannot read project description");
            return Outcome::degraded(ProjectModel::empty(path), DspTreeError::io(path, e));
        }
    };

    let base_dir = base_directory(path);
    let mut parser = LineParser::new(&base_dir, encoding);
    for (index, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let decoded = decode_bytes(raw, encoding);
        let verbatim = decoded.is_degraded();
        if verbatim {
            debug!(line = index + 1, "line kept as raw bytes");
        }
        let line = parser.outcome.absorb(decoded);
        parser.feed(index + 1, &line, verbatim);
    }
    parser.finish(path)
}

fn base_directory(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let absolute = std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf());
    normalize_lexically(&absolute)
}

/// Parses already-decoded description text.
///
/// `file_path` only names the project; member files resolve against
/// `base_dir`.
pub fn parse_project_text(
    text: &str,
    file_path: &Path,
    base_dir: &Path,
    encoding: TextEncoding,
) -> Outcome<ProjectModel> {
    let mut parser = LineParser::new(base_dir, encoding);
    for (index, line) in text.lines().enumerate() {
        parser.feed(index + 1, line, false);
    }
    parser.finish(file_path)
}

struct PendingGroup {
    name: String,
    filter: String,
    files: Vec<PathBuf>,
}

#[derive(Default)]
struct Buckets {
    source: Vec<PathBuf>,
    header: Vec<PathBuf>,
    resource: Vec<PathBuf>,
    other: Vec<PathBuf>,
}

impl Buckets {
    fn get_mut(&mut self, category: FileCategory) -> &mut Vec<PathBuf> {
        match category {
            FileCategory::Source => &mut self.source,
            FileCategory::Header => &mut self.header,
            FileCategory::Resource => &mut self.resource,
            FileCategory::Other => &mut self.other,
        }
    }
}

struct LineParser<'a> {
    base_dir: &'a Path,
    encoding: TextEncoding,
    groups: Vec<PendingGroup>,
    current_group: Option<PendingGroup>,
    in_file_entry: bool,
    buckets: Buckets,
    declared_name: Option<String>,
    target_type: Option<String>,
    outcome: Outcome<()>,
}

impl<'a> LineParser<'a> {
    fn new(base_dir: &'a Path, encoding: TextEncoding) -> Self {
        Self {
            base_dir,
            encoding,
            groups: Vec::new(),
            current_group: None,
            in_file_entry: false,
            buckets: Buckets::default(),
            declared_name: None,
            target_type: None,
            outcome: Outcome::clean(()),
        }
    }

    fn feed(&mut self, line_number: usize, line: &str, verbatim: bool) {
        let line = match line_number {
            1 => line.strip_prefix(BYTE_ORDER_MARK).unwrap_or(line),
            _ => line,
        };
        let line = line.trim();
        if line.starts_with("# Begin Group") {
            self.begin_group(line_number, line);
        } else if line.starts_with("# PROP Default_Filter") {
            self.default_filter(line_number, line);
        } else if line == END_GROUP {
            self.end_group();
        } else if line == BEGIN_SOURCE_FILE {
            self.in_file_entry = true;
        } else if let Some(raw) = line.strip_prefix(SOURCE_PREFIX) {
            if self.in_file_entry {
                self.source(line_number, raw, verbatim);
            }
        } else if line == END_SOURCE_FILE {
            self.in_file_entry = false;
        } else if self.declared_name.is_none()
            && line.starts_with("# Microsoft Developer Studio Project File")
        {
            if let Some(caps) = PROJECT_HEADER.captures(line) {
                self.declared_name = Some(caps[1].to_string());
            }
        } else if self.target_type.is_none() && line.starts_with("# TARGTYPE") {
            if let Some(caps) = TARGET_TYPE.captures(line) {
                self.target_type = Some(caps[1].to_string());
            }
        }
    }

    fn malformed(&mut self, line: usize, directive: &'static str) {
        debug!(line, directive, "skipping malformed directive");
        self.outcome.push(DspTreeError::MalformedDirective { line, directive });
    }

    fn begin_group(&mut self, line_number: usize, line: &str) {
        let Some(caps) = BEGIN_GROUP.captures(line) else {
            self.malformed(line_number, "# Begin Group");
            return;
        };
        if let Some(replaced) = self.current_group.take() {
            warn!(
                group = %replaced.name,
                line = line_number,
                "group opened before the previous one was closed, dropping the previous group"
            );
        }
        self.current_group = Some(PendingGroup {
            name: caps[1].to_string(),
            filter: String::new(),
            files: Vec::new(),
        });
    }

    fn default_filter(&mut self, line_number: usize, line: &str) {
        if self.current_group.is_none() {
            return;
        }
        let Some(caps) = DEFAULT_FILTER.captures(line) else {
            self.malformed(line_number, "# PROP Default_Filter");
            return;
        };
        if let Some(group) = self.current_group.as_mut() {
            group.filter = caps[1].to_string();
        }
    }

    fn end_group(&mut self) {
        if let Some(group) = self.current_group.take() {
            self.groups.push(group);
        }
    }

    fn source(&mut self, line_number: usize, raw: &str, verbatim: bool) {
        let raw = raw.trim();
        let unquoted = match raw.strip_prefix('"') {
            Some(rest) => rest.strip_suffix('"').unwrap_or(rest),
            None => raw,
        };
        if unquoted.is_empty() {
            self.malformed(line_number, "SOURCE=");
            return;
        }

        let relative = unquoted.replace(['\\', '/'], MAIN_SEPARATOR_STR);
        let extension = lowercase_extension(Path::new(&relative));
        let on_disk = if verbatim {
            binary_path(&relative)
        } else {
            self.outcome.absorb(native_path(&relative, self.encoding))
        };
        let full_path = normalize_lexically(&self.base_dir.join(on_disk));

        match self.current_group.as_mut() {
            Some(group) => group.files.push(full_path),
            None => self
                .buckets
                .get_mut(FileCategory::from_extension(&extension))
                .push(full_path),
        }
    }

    fn finish(self, file_path: &Path) -> Outcome<ProjectModel> {
        let LineParser {
            base_dir,
            encoding,
            groups,
            current_group,
            buckets,
            declared_name,
            target_type,
            mut outcome,
            ..
        } = self;
        if let Some(dangling) = current_group {
            warn!(group = %dangling.name, "discarding group without `# End Group`");
        }

        let mut model = ProjectModel::empty(file_path);
        if let Some(stem) = file_path.file_stem() {
            model.name = outcome.absorb(display_name(stem, encoding));
        }
        model.declared_name = declared_name;
        model.target_type = target_type;

        model.groups = groups
            .into_iter()
            .map(|pending| {
                let children = outcome.absorb(build_tree(&pending.files, base_dir, encoding));
                let original_name =
                    outcome.absorb(convert(&pending.name, TextEncoding::Utf8, encoding));
                Group {
                    root: FolderNode {
                        name: pending.name.clone(),
                        path: None,
                        children,
                    },
                    name: pending.name,
                    original_name,
                    filter: pending.filter,
                }
            })
            .collect();
        model.source_files = outcome.absorb(build_tree(&buckets.source, base_dir, encoding));
        model.header_files = outcome.absorb(build_tree(&buckets.header, base_dir, encoding));
        model.resource_files = outcome.absorb(build_tree(&buckets.resource, base_dir, encoding));
        model.other_files = outcome.absorb(build_tree(&buckets.other, base_dir, encoding));

        debug!(
            project = %model.name,
            groups = model.groups.len(),
            diagnostics = outcome.diagnostics.len(),
            "parsed project description"
        );
        outcome.map(|()| model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeNode;

    const SAMPLE: &str = "\
# Microsoft Developer Studio Project File - Name=\"Hello\" - Package Owner=<4>
# TARGTYPE \"Win32 (x86) Console Application\" 0x0103
# Begin Target
# Name \"Hello - Win32 Release\"
# Begin Group \"Source Files\"
# PROP Default_Filter \"cpp;c\"
# Begin Source File
SOURCE=.\\src\\main.cpp
# End Source File
# End Group
# Begin Source File
SOURCE=\"res\\app.rc\"
# End Source File
# Begin Source File
SOURCE=include\\app.h
# End Source File
# Begin Source File
SOURCE=ReadMe.txt
# End Source File
# End Target
";

    fn parse(text: &str) -> Outcome<ProjectModel> {
        parse_project_text(text, Path::new("/proj/Hello.dsp"), Path::new("/proj"), TextEncoding::Utf8)
    }

    #[test]
    fn reads_header_fields() {
        let model = parse(SAMPLE).into_value();
        assert_eq!(model.name, "Hello");
        assert_eq!(model.declared_name.as_deref(), Some("Hello"));
        assert_eq!(
            model.target_type.as_deref(),
            Some("Win32 (x86) Console Application")
        );
    }

    #[test]
    fn buckets_ungrouped_files_by_extension() {
        let outcome = parse(SAMPLE);
        assert!(!outcome.is_degraded());
        let model = outcome.into_value();
        assert_eq!(model.groups.len(), 1);
        assert!(model.source_files.is_empty());
        assert_eq!(model.header_files[0].name(), "include");
        assert_eq!(model.resource_files[0].children()[0].name(), "app.rc");
        assert!(matches!(&model.other_files[0], TreeNode::File(f) if f.path == Path::new("/proj/ReadMe.txt")));
    }

    #[test]
    fn source_outside_file_entry_is_ignored() {
        let model = parse("SOURCE=stray.c\n").into_value();
        assert!(model.is_empty());
    }

    #[test]
    fn malformed_group_is_reported_and_skipped() {
        let text = "# Begin Group \"Broken\n# Begin Source File\nSOURCE=a.c\n# End Source File\n";
        let outcome = parse(text);
        assert!(matches!(
            outcome.diagnostics[0],
            DspTreeError::MalformedDirective { line: 1, directive: "# Begin Group" }
        ));
        let model = outcome.into_value();
        assert!(model.groups.is_empty());
        assert_eq!(model.source_files.len(), 1);
    }

    #[test]
    fn empty_filter_is_accepted() {
        let text = "# Begin Group \"Docs\"\n# PROP Default_Filter \"\"\n# End Group\n";
        let outcome = parse(text);
        assert!(!outcome.is_degraded());
        let model = outcome.into_value();
        assert_eq!(model.groups[0].filter, "");
    }

    #[test]
    fn reopened_group_replaces_the_open_one() {
        let text = "\
# Begin Group \"A\"
# Begin Source File
SOURCE=a.c
# End Source File
# Begin Group \"B\"
# Begin Source File
SOURCE=b.c
# End Source File
# End Group
# End Group
";
        let model = parse(text).into_value();
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].name, "B");
        assert_eq!(model.groups[0].root.children.len(), 1);
    }

    #[test]
    fn crlf_lines_and_parent_paths() {
        let text = "# Begin Group \"Shared\"\r\n# Begin Source File\r\nSOURCE=..\\common\\log.c\r\n# End Source File\r\n# End Group\r\n";
        let model = parse(text).into_value();
        let root = &model.groups[0].root;
        assert_eq!(root.children[0].name(), "..");
        let file = root.children[0].files().next().unwrap();
        assert_eq!(file.path, Path::new("/common/log.c"));
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let text = format!("\u{feff}{SAMPLE}");
        let model = parse(&text).into_value();
        assert_eq!(model.declared_name.as_deref(), Some("Hello"));
        assert_eq!(model.groups.len(), 1);

        let outcome = parse("\u{feff}# Begin Group \"Only\"\n# End Group\n");
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.value.groups[0].name, "Only");
    }
}
