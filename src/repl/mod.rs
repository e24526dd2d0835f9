//! Interactive query prompt.
//!
//! Type a query to run it, `help` for commands, Tab to complete.

pub mod commands;
pub mod completion;
pub mod session;

use std::io;

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor, EventHandler, KeyEvent};
use tracing::debug;

pub use completion::QueryHelper;
pub use session::{CommitSource, Evaluation, GitSource, Reply, Session};

use completion::TabCompleteOrAcceptHint;

const PROMPT: &str = "gitlinq> ";

/// Run the REPL until `exit` or Ctrl-D.
pub fn run<S: CommitSource>(mut session: Session<S>, history_size: usize) -> Result<()> {
    println!(
        "gitlinq v{} - query git commits with LINQ-style expressions",
        env!("CARGO_PKG_VERSION")
    );
    println!("Repository: {}", session.location());
    println!("Type 'help' for commands, 'examples' for sample queries, Tab to complete.");
    println!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .max_history_size(history_size.max(1))?
        .completion_type(CompletionType::List)
        .completion_prompt_limit(50)
        .build();

    let mut rl: Editor<QueryHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(QueryHelper::new(
        session.root_name(),
        session.root_type(),
    )));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );
    for entry in session.history().entries() {
        rl.add_history_entry(entry.query.as_str())?;
    }
    debug!(entries = session.history().len(), "restored line history");

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => match session.handle(&line) {
                Reply::Output(text) => print!("{}", text),
                Reply::Clear => execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?,
                Reply::Exit => break,
            },
            Err(ReadlineError::Interrupted) => {
                println!("(Ctrl+C) Type 'exit' to quit.");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}
