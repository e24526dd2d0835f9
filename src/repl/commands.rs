//! Built-in REPL commands and the text they print.

use crate::ast::SEQUENCE_OPERATORS;
use crate::editor::HistoryEntry;
use crate::engine::DEFAULT_ROOT_NAME;
use crate::explain::strip_explain_command;
use crate::snippets::{SavedQuery, EXAMPLE_GROUPS};

/// Command names offered by completion, with their help line.
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "Show this help (h, ?)"),
    ("examples", "Show example queries and saved bookmarks (ex, samples)"),
    ("history", "Show recent queries: history [count | text] (hist)"),
    ("explain", "Show the compiled plan: explain <query>"),
    ("save", "Bookmark the last successful query: save <name>"),
    ("clear", "Clear the screen (cls)"),
    ("exit", "Quit the REPL (quit, Ctrl-D)"),
];

pub const DEFAULT_HISTORY_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Help,
    Examples,
    History(Option<&'a str>),
    Explain(&'a str),
    Save(&'a str),
    Clear,
    Exit,
    Query(&'a str),
}

impl<'a> Command<'a> {
    /// Classify one line of input. Anything that is not a command is a query.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if let Some(query) = strip_explain_command(line) {
            return Command::Explain(query);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = if rest.is_empty() { None } else { Some(rest) };
        match word.to_lowercase().as_str() {
            "help" | "h" | "?" => Command::Help,
            "examples" | "ex" | "samples" => Command::Examples,
            "history" | "hist" => Command::History(argument),
            "save" => Command::Save(rest),
            "clear" | "cls" => Command::Clear,
            "exit" | "quit" => Command::Exit,
            _ => Command::Query(line),
        }
    }
}

pub fn help_text(root_name: &str) -> String {
    let mut out = String::new();
    out.push_str("Commands:\n");
    for (name, description) in COMMANDS {
        out.push_str(&format!("  {:<12} {}\n", name, description));
    }
    out.push_str("\nQueries:\n");
    out.push_str(&format!(
        "  Start from {} and chain operators with '.', e.g.\n",
        root_name
    ));
    out.push_str(&format!(
        "    {}.Where(c => c.Message.Contains(\"fix\")).Take(5)\n",
        root_name
    ));
    out.push_str(&format!("  Operators: {}\n", SEQUENCE_OPERATORS.join(", ")));
    out.push_str("  Comparisons: == != > < >= <=, combined with && and ||\n");
    out.push_str("  Strings use double or single quotes. Tab completes names.\n");
    out
}

fn with_root(query: &str, root_name: &str) -> String {
    match query.strip_prefix(DEFAULT_ROOT_NAME) {
        Some(rest) => format!("{}{}", root_name, rest),
        None => query.to_string(),
    }
}

pub fn examples_text(builtins: &[SavedQuery], bookmarks: &[SavedQuery], root_name: &str) -> String {
    let width = builtins
        .iter()
        .chain(bookmarks)
        .map(|s| with_root(&s.query, root_name).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::from("Example Queries:\n");
    for (tag, title) in EXAMPLE_GROUPS {
        out.push_str(&format!("\n  — {} —\n", title));
        for snippet in builtins.iter().filter(|s| s.has_tag(tag)) {
            out.push_str(&format!(
                "    {:<width$}  {}\n",
                with_root(&snippet.query, root_name),
                snippet.description.as_deref().unwrap_or(""),
                width = width
            ));
        }
    }

    if !bookmarks.is_empty() {
        out.push_str("\n  — Saved Queries —\n");
        for bookmark in bookmarks {
            out.push_str(&format!(
                "    {:<width$}  {}\n",
                bookmark.query,
                bookmark.name,
                width = width
            ));
        }
    }
    out
}

pub fn history_text(entries: &[&HistoryEntry], filtered: bool) -> String {
    if entries.is_empty() {
        return if filtered {
            "No matching queries.\n".to_string()
        } else {
            "No history yet.\n".to_string()
        };
    }
    let mut out = String::new();
    for entry in entries {
        let status = if entry.success { "ok " } else { "err" };
        out.push_str(&format!(
            "  {}  {}  {:>6}ms  {}\n",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            status,
            entry.execution_time_ms,
            entry.query
        ));
    }
    out
}
