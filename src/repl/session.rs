use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::ast::parse_query;
use crate::config::Config;
use crate::display::{render, render_error, ContentSearch, DisplayOptions};
use crate::editor::{HistoryEntry, QueryHistory};
use crate::engine::value::ValueType;
use crate::engine::{compile_query, run, RootSource};
use crate::explain::{explain, format_duration, render as render_plan};
use crate::export::{to_csv, to_json, OutputFormat};
use crate::git::GitService;
use crate::model::commit_type;
use crate::snippets::{
    built_in_snippets, load_bookmarks, save_bookmarks, upsert_bookmark, SavedQuery,
};

use super::commands::{examples_text, help_text, history_text, Command, DEFAULT_HISTORY_COUNT};

/// Where the commits a query runs over come from. Fetched again for every
/// query so each one sees the repository as it is now.
pub trait CommitSource {
    /// Human-readable location, recorded in history.
    fn location(&self) -> String;
    fn load(&self) -> Result<RootSource>;
}

pub struct GitSource {
    git: GitService,
    root_name: String,
    max_commits: Option<usize>,
}

impl GitSource {
    pub fn new(git: GitService, config: &Config) -> Self {
        Self {
            git,
            root_name: config.root_name.clone(),
            max_commits: config.max_commits,
        }
    }
}

impl CommitSource for GitSource {
    fn location(&self) -> String {
        self.git.root().display().to_string()
    }

    fn load(&self) -> Result<RootSource> {
        let commits = self.git.commits(self.max_commits)?;
        Ok(RootSource::from_commits(self.root_name.clone(), commits))
    }
}

/// Rendered result of one query.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub output: String,
    pub success: bool,
    pub elapsed: Duration,
}

/// What the loop should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Clear,
    Exit,
}

pub struct Session<S> {
    source: S,
    config: Config,
    options: DisplayOptions,
    history: QueryHistory,
    bookmarks: Vec<SavedQuery>,
    last_query: Option<String>,
    persist: bool,
}

impl<S: CommitSource> Session<S> {
    pub fn new(source: S, config: Config) -> Self {
        let options = DisplayOptions::from_config(&config);
        let history = QueryHistory::new().with_max_entries(config.history_size);
        Self {
            source,
            config,
            options,
            history,
            bookmarks: Vec::new(),
            last_query: None,
            persist: false,
        }
    }

    /// Load history and bookmarks from disk and write them back as they
    /// change. Unreadable files are logged and replaced with empty ones.
    pub fn with_persistence(mut self) -> Self {
        self.history = QueryHistory::load()
            .unwrap_or_else(|e| {
                warn!(error = %e, "could not read query history, starting empty");
                QueryHistory::new()
            })
            .with_max_entries(self.config.history_size);
        self.bookmarks = load_bookmarks().unwrap_or_else(|e| {
            warn!(error = %e, "could not read bookmarks");
            Vec::new()
        });
        self.persist = true;
        self
    }

    pub fn root_name(&self) -> &str {
        &self.config.root_name
    }

    pub fn root_type(&self) -> ValueType {
        ValueType::list_of(ValueType::Record(commit_type()))
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn bookmarks(&self) -> &[SavedQuery] {
        &self.bookmarks
    }

    /// Run `text` once and render the result in `format`.
    pub fn evaluate(&self, text: &str, format: OutputFormat) -> Evaluation {
        let root = match self.source.load() {
            Ok(root) => root,
            Err(e) => {
                return Evaluation {
                    output: format!("Error: {:#}\n", e),
                    success: false,
                    elapsed: Duration::ZERO,
                }
            }
        };

        match run(text, &root) {
            Ok(outcome) => {
                let output = match format {
                    OutputFormat::Table => {
                        let search = parse_query(text)
                            .ok()
                            .and_then(|node| ContentSearch::find(&node));
                        render(
                            &outcome.value,
                            &self.options.clone().with_content_search(search),
                        )
                    }
                    OutputFormat::Json => format!("{}\n", to_json(&outcome.value)),
                    OutputFormat::Csv => to_csv(&outcome.value),
                };
                Evaluation {
                    output,
                    success: true,
                    elapsed: outcome.elapsed,
                }
            }
            Err(e) => {
                debug!(error = %e, category = %e.category(), "query failed");
                Evaluation {
                    output: render_error(&e, text, &self.options),
                    success: false,
                    elapsed: Duration::ZERO,
                }
            }
        }
    }

    /// Handle one line typed at the prompt.
    pub fn handle(&mut self, line: &str) -> Reply {
        match Command::parse(line) {
            Command::Empty => Reply::Output(String::new()),
            Command::Help => Reply::Output(help_text(self.root_name())),
            Command::Examples => Reply::Output(examples_text(
                &built_in_snippets(),
                &self.bookmarks,
                self.root_name(),
            )),
            Command::History(argument) => Reply::Output(self.show_history(argument)),
            Command::Explain(query) => Reply::Output(self.explain(query)),
            Command::Save(name) => Reply::Output(self.save(name)),
            Command::Clear => Reply::Clear,
            Command::Exit => Reply::Exit,
            Command::Query(query) => Reply::Output(self.query(query)),
        }
    }

    fn query(&mut self, text: &str) -> String {
        let evaluation = self.evaluate(text, OutputFormat::Table);

        let mut entry = HistoryEntry::new(text, self.source.location());
        entry.execution_time_ms = evaluation.elapsed.as_millis() as u64;
        entry.success = evaluation.success;
        self.history.add(entry);
        if self.persist {
            if let Err(e) = self.history.save() {
                warn!(error = %e, "could not save query history");
            }
        }

        let mut output = evaluation.output;
        if evaluation.success {
            self.last_query = Some(text.to_string());
            output.push_str(&format!("Executed in {}\n", format_duration(evaluation.elapsed)));
        }
        output
    }

    fn show_history(&self, argument: Option<&str>) -> String {
        match argument {
            None => {
                let entries: Vec<&HistoryEntry> =
                    self.history.recent(DEFAULT_HISTORY_COUNT).iter().collect();
                history_text(&entries, false)
            }
            Some(argument) => match argument.parse::<usize>() {
                Ok(count) => {
                    let entries: Vec<&HistoryEntry> = self.history.recent(count).iter().collect();
                    history_text(&entries, false)
                }
                Err(_) => history_text(&self.history.search(argument), true),
            },
        }
    }

    fn explain(&self, query: &str) -> String {
        if query.is_empty() {
            return "Usage: explain <query>\n".to_string();
        }
        let root = match self.source.load() {
            Ok(root) => root,
            Err(e) => return format!("Error: {:#}\n", e),
        };
        match compile_query(query, &root) {
            Ok(plan) => render_plan(&explain(&plan)),
            Err(e) => render_error(&e, query, &self.options),
        }
    }

    fn save(&mut self, name: &str) -> String {
        if name.is_empty() {
            return "Usage: save <name>\n".to_string();
        }
        let query = match &self.last_query {
            Some(query) => query.clone(),
            None => return "Nothing to save yet. Run a query first.\n".to_string(),
        };
        let replaced = upsert_bookmark(&mut self.bookmarks, SavedQuery::bookmark(name, &query));
        if self.persist {
            if let Err(e) = save_bookmarks(&self.bookmarks) {
                warn!(error = %e, "could not save bookmarks");
                return format!("Error: could not save bookmark: {:#}\n", e);
            }
        }
        let verb = if replaced { "Updated" } else { "Saved" };
        format!("{} bookmark '{}': {}\n", verb, name, query)
    }
}
