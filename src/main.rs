use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn, Level};

use gitlinq::config::Config;
use gitlinq::export::OutputFormat;
use gitlinq::git::GitService;
use gitlinq::repl::{self, GitSource, Session};

/// Query git commits with LINQ-style expressions
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Run a single query and exit instead of starting the REPL
    #[arg(short, long)]
    query: Option<String>,

    /// Repository to query (defaults to the current directory)
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Read at most this many commits
    #[arg(short = 'n', long = "max-count")]
    max_count: Option<usize>,

    /// Output format for one-shot queries
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Log debug information to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn debug_requested() -> bool {
    std::env::var("GITLINQ_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn main() -> ExitCode {
    // Parse CLI args before anything prints
    let cli = Cli::parse();

    let level = if cli.verbose || debug_requested() {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable configuration");
        Config::default()
    });
    if cli.max_count.is_some() {
        config.max_commits = cli.max_count;
    }
    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        config.color = false;
    }

    let start = match cli.repo {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let git = GitService::discover(&start)?;
    debug!(root = %git.root().display(), "using repository");

    let source = GitSource::new(git, &config);
    match cli.query {
        Some(query) => {
            if !std::io::stdout().is_terminal() {
                config.color = false;
            }
            let session = Session::new(source, config);
            let evaluation = session.evaluate(&query, cli.format);
            if evaluation.success {
                print!("{}", evaluation.output);
                Ok(ExitCode::SUCCESS)
            } else {
                eprint!("{}", evaluation.output);
                Ok(ExitCode::FAILURE)
            }
        }
        None => {
            let history_size = config.history_size;
            repl::run(Session::new(source, config).with_persistence(), history_size)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
