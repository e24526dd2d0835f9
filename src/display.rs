//! Console rendering of query results and errors.
//!
//! Everything here renders to a `String` so the REPL and the one-shot CLI
//! can print it, and tests can inspect it with colour turned off.

use crossterm::style::{Color, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::ast::Node;
use crate::config::Config;
use crate::engine::value::{Record, Value, ValueType};
use crate::error::{ErrorCategory, QueryError};
use crate::model::{commit_type, file_change_type, CommitInfo, FileChange, LineKind};
use crate::table::{cell_text, ResultTable};

const GENERIC_COLUMN_WIDTH: usize = 40;
const MATCH_LINE_WIDTH: usize = 80;

#[derive(Debug, Clone)]
pub struct Theme {
    pub text_muted: Color,
    pub text_accent: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub renamed: Color,
    pub highlight: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            text_muted: Color::Rgb { r: 120, g: 125, b: 145 },
            text_accent: Color::Rgb { r: 100, g: 180, b: 255 },
            success: Color::Rgb { r: 80, g: 200, b: 120 },
            warning: Color::Rgb { r: 255, g: 190, b: 80 },
            error: Color::Rgb { r: 255, g: 100, b: 100 },
            info: Color::Rgb { r: 86, g: 182, b: 194 },
            renamed: Color::Rgb { r: 198, g: 120, b: 221 },
            highlight: Color::Rgb { r: 229, g: 192, b: 123 },
        }
    }
}

/// A content search found in the query text, used to show the matching
/// diff lines under a commit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSearch {
    pub text: String,
    pub added: bool,
    pub deleted: bool,
}

impl ContentSearch {
    /// First `AddedContains`/`DeletedContains`/`ContentContains` call with a
    /// literal argument, searching depth-first.
    pub fn find(node: &Node) -> Option<Self> {
        match node {
            Node::MethodCall {
                target,
                method,
                arguments,
            } => {
                let kinds = match method.to_ascii_lowercase().as_str() {
                    "addedcontains" => Some((true, false)),
                    "deletedcontains" => Some((false, true)),
                    "contentcontains" => Some((true, true)),
                    _ => None,
                };
                if let (Some((added, deleted)), Some(Node::StringLiteral(text))) =
                    (kinds, arguments.first())
                {
                    return Some(Self {
                        text: text.clone(),
                        added,
                        deleted,
                    });
                }
                Self::find(target).or_else(|| arguments.iter().find_map(Self::find))
            }
            Node::MemberAccess { target, .. } => Self::find(target),
            Node::Lambda { body, .. } => Self::find(body),
            Node::Binary { left, right, .. } => Self::find(left).or_else(|| Self::find(right)),
            Node::Identifier(_) | Node::StringLiteral(_) | Node::NumberLiteral(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub color: bool,
    pub author_width: usize,
    pub message_width: usize,
    pub content_search: Option<ContentSearch>,
    pub theme: Theme,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DisplayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            color: config.color,
            author_width: config.author_width,
            message_width: config.message_width,
            content_search: None,
            theme: Theme::default(),
        }
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    pub fn with_content_search(mut self, search: Option<ContentSearch>) -> Self {
        self.content_search = search;
        self
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        self.paint(text, self.theme.text_muted)
    }
}

/// Render any query result for the console.
pub fn render(value: &Value, options: &DisplayOptions) -> String {
    match value {
        Value::Null => format!("{}\n", options.muted("(null)")),
        Value::Bool(b) => {
            let color = if *b {
                options.theme.success
            } else {
                options.theme.error
            };
            format!("{}\n", options.paint(&value.display(), color))
        }
        Value::Int(_) | Value::Long(_) => {
            format!("{}\n", options.paint(&value.display(), options.theme.success))
        }
        Value::Text(_) | Value::Timestamp(_) => {
            format!("{}\n", options.paint(&value.display(), options.theme.warning))
        }
        Value::Record(record) if std::ptr::eq(record.type_info(), commit_type()) => {
            render_commits(std::slice::from_ref(value), options)
        }
        Value::Record(record) if std::ptr::eq(record.type_info(), file_change_type()) => {
            render_files(std::slice::from_ref(value), options)
        }
        Value::Record(_) => render_generic(&ResultTable::from_value(value), options),
        Value::List(seq) => match seq.element_type() {
            ValueType::Record(info) if std::ptr::eq(*info, commit_type()) => {
                render_commits(seq.items(), options)
            }
            ValueType::Record(info) if std::ptr::eq(*info, file_change_type()) => {
                render_files(seq.items(), options)
            }
            _ if seq.is_empty() => format!("{}\n", options.muted("No results.")),
            _ => render_generic(&ResultTable::from_value(value), options),
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

struct Column {
    title: String,
    color: Option<Color>,
    align: Align,
}

impl Column {
    fn new(title: impl Into<String>, color: Option<Color>, align: Align) -> Self {
        Self {
            title: title.into(),
            color,
            align,
        }
    }
}

struct Cell {
    text: String,
    color: Option<Color>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

fn render_table(columns: &[Column], rows: &[Vec<Cell>], options: &DisplayOptions) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.title.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.text.width());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| {
            let padded = pad(&column.title, *width, column.align);
            match column.color {
                Some(color) => options.bold(&padded, color),
                None => options.bold(&padded, options.theme.text_accent),
            }
        })
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&options.muted(&"─".repeat(rule_width)));
    out.push('\n');

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(columns.iter().zip(&widths))
            .map(|(cell, (column, width))| {
                let padded = pad(&cell.text, *width, column.align);
                match cell.color {
                    Some(color) => options.paint(&padded, color),
                    None => padded,
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn footer(count: usize, noun: &str, options: &DisplayOptions) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{}\n", options.muted(&format!("({} {}{})", count, noun, plural)))
}

fn render_commits(items: &[Value], options: &DisplayOptions) -> String {
    let commits: Vec<&CommitInfo> = items
        .iter()
        .filter_map(|item| item.as_record::<CommitInfo>())
        .collect();
    if commits.is_empty() {
        return format!("{}\n", options.muted("No commits found."));
    }

    let theme = &options.theme;
    let columns = [
        Column::new("SHA", Some(theme.success), Align::Left),
        Column::new("Author", Some(theme.text_accent), Align::Left),
        Column::new("Date", Some(theme.warning), Align::Left),
        Column::new("Files", Some(theme.info), Align::Right),
        Column::new("+", Some(theme.success), Align::Right),
        Column::new("-", Some(theme.error), Align::Right),
        Column::new("Message", None, Align::Left),
    ];
    let rows: Vec<Vec<Cell>> = commits
        .iter()
        .map(|commit| {
            vec![
                Cell::colored(commit.short_sha(), theme.success),
                Cell::plain(truncate(&commit.author_name, options.author_width)),
                Cell::plain(commit.author_when.format("%Y-%m-%d %H:%M").to_string()),
                Cell::plain(commit.diff.files_changed().to_string()),
                Cell::colored(format!("+{}", commit.diff.total_lines_added()), theme.success),
                Cell::colored(format!("-{}", commit.diff.total_lines_deleted()), theme.error),
                Cell::plain(truncate(commit.message_short(), options.message_width)),
            ]
        })
        .collect();

    let mut out = render_table(&columns, &rows, options);
    out.push_str(&footer(commits.len(), "commit", options));
    if let Some(search) = &options.content_search {
        out.push_str(&render_content_matches(&commits, search, options));
    }
    out
}

fn status_color(file: &FileChange, theme: &Theme) -> Color {
    match file.status.as_str() {
        "Added" => theme.success,
        "Deleted" => theme.error,
        "Modified" => theme.warning,
        "Renamed" | "Copied" => theme.renamed,
        _ => theme.text_muted,
    }
}

fn render_files(items: &[Value], options: &DisplayOptions) -> String {
    let files: Vec<&FileChange> = items
        .iter()
        .filter_map(|item| item.as_record::<FileChange>())
        .collect();
    if files.is_empty() {
        return format!("{}\n", options.muted("No files found."));
    }

    let theme = &options.theme;
    let columns = [
        Column::new("Status", Some(theme.warning), Align::Left),
        Column::new("+", Some(theme.success), Align::Right),
        Column::new("-", Some(theme.error), Align::Right),
        Column::new("Path", None, Align::Left),
    ];
    let rows: Vec<Vec<Cell>> = files
        .iter()
        .map(|file| {
            let path = if file.is_binary {
                format!("{} (binary)", file.display_path())
            } else {
                file.display_path()
            };
            vec![
                Cell::colored(file.status.as_str(), status_color(file, theme)),
                Cell::colored(format!("+{}", file.lines_added()), theme.success),
                Cell::colored(format!("-{}", file.lines_deleted()), theme.error),
                Cell::plain(path),
            ]
        })
        .collect();

    let mut out = render_table(&columns, &rows, options);
    out.push_str(&footer(files.len(), "file", options));
    out
}

fn render_generic(table: &ResultTable, options: &DisplayOptions) -> String {
    let columns: Vec<Column> = table
        .columns
        .iter()
        .map(|c| Column::new(c.name.clone(), None, Align::Left))
        .collect();
    let rows: Vec<Vec<Cell>> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| match value {
                    Value::Null => Cell::colored("(null)", options.theme.text_muted),
                    Value::Int(_) | Value::Long(_) => {
                        Cell::colored(value.display(), options.theme.success)
                    }
                    other => Cell::plain(truncate(&cell_text(other), GENERIC_COLUMN_WIDTH)),
                })
                .collect()
        })
        .collect();

    let mut out = render_table(&columns, &rows, options);
    out.push_str(&footer(table.row_count(), "row", options));
    out
}

fn render_content_matches(
    commits: &[&CommitInfo],
    search: &ContentSearch,
    options: &DisplayOptions,
) -> String {
    let theme = &options.theme;
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!(
        "{} '{}':\n",
        options.bold("Matching lines for", theme.info),
        options.paint(&search.text, theme.warning)
    ));

    let mut total = 0;
    for commit in commits {
        let matches = commit
            .diff
            .matching_lines(&search.text, search.added, search.deleted);
        if matches.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!(
            "{} {}\n",
            options.paint(commit.short_sha(), theme.success),
            options.muted(commit.message_short())
        ));
        for line in &matches {
            let (symbol, color) = match line.kind {
                LineKind::Deleted => ("-", theme.error),
                _ => ("+", theme.success),
            };
            out.push_str(&format!(
                "  {} {}\n",
                options.muted(&line.path),
                options.bold(&format!("({})", symbol), color)
            ));
            if let Some(before) = &line.before {
                out.push_str(&format!("      {}\n", options.muted(&truncate(before, MATCH_LINE_WIDTH))));
            }
            out.push_str(&format!(
                "    {} {}\n",
                options.bold("→", color),
                highlight(&truncate(&line.text, MATCH_LINE_WIDTH), &search.text, options)
            ));
            if let Some(after) = &line.after {
                out.push_str(&format!("      {}\n", options.muted(&truncate(after, MATCH_LINE_WIDTH))));
            }
            total += 1;
        }
    }
    out.push('\n');
    out.push_str(&footer(total, "matching location", options));
    out
}

/// Colour the first case-insensitive occurrence of `search` in `line`.
fn highlight(line: &str, search: &str, options: &DisplayOptions) -> String {
    if !options.color || search.is_empty() {
        return line.to_string();
    }
    let lower = line.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII; only highlight when
    // offsets still line up.
    if lower.len() != line.len() {
        return line.to_string();
    }
    match lower.find(&search.to_lowercase()) {
        Some(start) => {
            let end = start + search.len();
            match (line.get(..start), line.get(start..end), line.get(end..)) {
                (Some(before), Some(hit), Some(after)) => format!(
                    "{}{}{}",
                    before,
                    options.bold(hit, options.theme.highlight),
                    after
                ),
                _ => line.to_string(),
            }
        }
        None => line.to_string(),
    }
}

/// Shorten `text` to at most `max` display columns, ending in `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}

fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{}{}", text, fill),
        Align::Right => format!("{}{}", fill, text),
    }
}

/// Render a query failure with its category heading. Syntax errors also
/// point at the failing column of `query`.
pub fn render_error(err: &QueryError, query: &str, options: &DisplayOptions) -> String {
    let color = match err.category() {
        ErrorCategory::Syntax | ErrorCategory::Runtime => options.theme.error,
        ErrorCategory::Resolution => options.theme.warning,
    };
    let mut out = format!(
        "{} {}\n",
        options.bold(&format!("{}:", err.category()), color),
        err
    );
    if let QueryError::Parse(parse) = err {
        for line in parse.pointer(query).lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}
