use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::engine::schema::{field, receiver, text_arg, TypeInfo};
use crate::engine::value::{Record, Sequence, Value, ValueType};

/// How a file was touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "Added",
            ChangeStatus::Deleted => "Deleted",
            ChangeStatus::Modified => "Modified",
            ChangeStatus::Renamed => "Renamed",
            ChangeStatus::Copied => "Copied",
            ChangeStatus::TypeChanged => "TypeChanged",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Deleted,
    Context,
}

/// One line of a patch hunk, in patch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    pub fn added(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Added,
            text: text.into(),
        }
    }

    pub fn deleted(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Deleted,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Context,
            text: text.into(),
        }
    }
}

/// A changed line that matched a content search, with its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    pub path: String,
    pub kind: LineKind,
    pub text: String,
    pub search: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    pub is_binary: bool,
    pub lines: Vec<DiffLine>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            status,
            is_binary: false,
            lines: Vec::new(),
        }
    }

    pub fn with_old_path(mut self, old_path: impl Into<String>) -> Self {
        self.old_path = Some(old_path.into());
        self
    }

    pub fn binary(mut self) -> Self {
        self.is_binary = true;
        self
    }

    pub fn with_lines(mut self, lines: Vec<DiffLine>) -> Self {
        self.lines = lines;
        self
    }

    pub fn added_content(&self) -> impl Iterator<Item = &str> {
        self.lines_of(LineKind::Added)
    }

    pub fn deleted_content(&self) -> impl Iterator<Item = &str> {
        self.lines_of(LineKind::Deleted)
    }

    fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(move |l| l.kind == kind)
            .map(|l| l.text.as_str())
    }

    pub fn lines_added(&self) -> i32 {
        self.added_content().count() as i32
    }

    pub fn lines_deleted(&self) -> i32 {
        self.deleted_content().count() as i32
    }

    pub fn added_contains(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.added_content().any(|l| contains_ignore_case(l, &needle))
    }

    pub fn deleted_contains(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.deleted_content().any(|l| contains_ignore_case(l, &needle))
    }

    pub fn content_contains(&self, text: &str) -> bool {
        self.added_contains(text) || self.deleted_contains(text)
    }

    /// Changed lines of the requested kinds containing `text`, each with one
    /// line of surrounding patch context.
    pub fn matching_lines(&self, text: &str, added: bool, deleted: bool) -> Vec<MatchedLine> {
        let needle = text.to_lowercase();
        let neighbour = |i: Option<usize>| i.and_then(|i| self.lines.get(i)).map(|l| l.text.clone());
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| match line.kind {
                LineKind::Added => added,
                LineKind::Deleted => deleted,
                LineKind::Context => false,
            })
            .filter(|(_, line)| contains_ignore_case(&line.text, &needle))
            .map(|(i, line)| MatchedLine {
                path: self.path.clone(),
                kind: line.kind,
                text: line.text.clone(),
                search: text.to_string(),
                before: neighbour(i.checked_sub(1)),
                after: neighbour(Some(i + 1)),
            })
            .collect()
    }

    /// `old → new` for renames and copies, the plain path otherwise.
    pub fn display_path(&self) -> String {
        match &self.old_path {
            Some(old) => format!("{} → {}", old, self.path),
            None => self.path.clone(),
        }
    }
}

fn text_sequence<'a>(lines: impl Iterator<Item = &'a str>) -> Value {
    Value::List(Sequence::new(
        ValueType::Text,
        lines.map(Value::from).collect(),
    ))
}

impl Record for FileChange {
    fn type_info(&self) -> &'static TypeInfo {
        file_change_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn file_change_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("FileChange")
            .member("Path", ValueType::Text, |v| {
                field(v, |f: &FileChange| Value::from(f.path.as_str()))
            })
            .member("OldPath", ValueType::Text, |v| {
                field(v, |f: &FileChange| Value::from(f.old_path.as_deref()))
            })
            .member("Status", ValueType::Text, |v| {
                field(v, |f: &FileChange| Value::from(f.status.as_str()))
            })
            .member("LinesAdded", ValueType::Int, |v| {
                field(v, |f: &FileChange| Value::Int(f.lines_added()))
            })
            .member("LinesDeleted", ValueType::Int, |v| {
                field(v, |f: &FileChange| Value::Int(f.lines_deleted()))
            })
            .member("IsBinary", ValueType::Bool, |v| {
                field(v, |f: &FileChange| Value::Bool(f.is_binary))
            })
            .member("AddedContent", ValueType::list_of(ValueType::Text), |v| {
                field(v, |f: &FileChange| text_sequence(f.added_content()))
            })
            .member("DeletedContent", ValueType::list_of(ValueType::Text), |v| {
                field(v, |f: &FileChange| text_sequence(f.deleted_content()))
            })
            .method("AddedContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<FileChange>(v)?.added_contains(text_arg(args, 0)?)))
            })
            .method("DeletedContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<FileChange>(v)?.deleted_contains(text_arg(args, 0)?)))
            })
            .method("ContentContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<FileChange>(v)?.content_contains(text_arg(args, 0)?)))
            })
    })
}

/// All file changes of one commit.
#[derive(Debug, Clone, Default)]
pub struct DiffData {
    pub files: Vec<Rc<FileChange>>,
}

impl DiffData {
    pub fn new(files: Vec<FileChange>) -> Self {
        Self {
            files: files.into_iter().map(Rc::new).collect(),
        }
    }

    pub fn total_lines_added(&self) -> i32 {
        self.files.iter().map(|f| f.lines_added()).sum()
    }

    pub fn total_lines_deleted(&self) -> i32 {
        self.files.iter().map(|f| f.lines_deleted()).sum()
    }

    pub fn files_changed(&self) -> i32 {
        self.files.len() as i32
    }

    pub fn added_contains(&self, text: &str) -> bool {
        self.files.iter().any(|f| f.added_contains(text))
    }

    pub fn deleted_contains(&self, text: &str) -> bool {
        self.files.iter().any(|f| f.deleted_contains(text))
    }

    pub fn content_contains(&self, text: &str) -> bool {
        self.files.iter().any(|f| f.content_contains(text))
    }

    pub fn matching_lines(&self, text: &str, added: bool, deleted: bool) -> Vec<MatchedLine> {
        self.files
            .iter()
            .flat_map(|f| f.matching_lines(text, added, deleted))
            .collect()
    }

    fn files_value(&self) -> Value {
        let items = self
            .files
            .iter()
            .map(|f| Value::Record(f.clone()))
            .collect();
        Value::List(Sequence::new(
            ValueType::Record(file_change_type()),
            items,
        ))
    }
}

impl Record for DiffData {
    fn type_info(&self) -> &'static TypeInfo {
        diff_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn diff_type() -> &'static TypeInfo {
    static INFO: OnceLock<TypeInfo> = OnceLock::new();
    INFO.get_or_init(|| {
        TypeInfo::new("DiffData")
            .member(
                "Files",
                ValueType::list_of(ValueType::Record(file_change_type())),
                |v| field(v, DiffData::files_value),
            )
            .member("TotalLinesAdded", ValueType::Int, |v| {
                field(v, |d: &DiffData| Value::Int(d.total_lines_added()))
            })
            .member("TotalLinesDeleted", ValueType::Int, |v| {
                field(v, |d: &DiffData| Value::Int(d.total_lines_deleted()))
            })
            .member("FilesChanged", ValueType::Int, |v| {
                field(v, |d: &DiffData| Value::Int(d.files_changed()))
            })
            .method("AddedContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<DiffData>(v)?.added_contains(text_arg(args, 0)?)))
            })
            .method("DeletedContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<DiffData>(v)?.deleted_contains(text_arg(args, 0)?)))
            })
            .method("ContentContains", vec![ValueType::Text], ValueType::Bool, |v, args| {
                Ok(Value::Bool(receiver::<DiffData>(v)?.content_contains(text_arg(args, 0)?)))
            })
    })
}
