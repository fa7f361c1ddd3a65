mod commands;
mod gateway;
mod history;
mod render;
mod session;
mod state;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::{info, Level};

use commands::{Command, Control, COMMAND_NAMES};
use gateway::HttpGateway;
use history::HistoryStore;
use session::ResearchSession;

/// Readline helper providing completion and hints for slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMAND_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the REPL output.
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenv::dotenv();

    let data_dir =
        dotenv::var("INSIGHT_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let history_path = PathBuf::from(data_dir).join("history.json");
    let history = HistoryStore::open(&history_path);
    info!(
        path = %history_path.display(),
        records = history.len(),
        "history cache loaded"
    );

    let gateway = Arc::new(HttpGateway::from_env()?);
    info!("backend gateway initialized");

    let mut session = ResearchSession::new(gateway, history);

    let helper = CliHelper::new();
    let mut rl: Editor<CliHelper, rustyline::history::DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Agentic Insight Scraper ===".bold());
    println!(
        "{}",
        "Deep web research & summarization. Type a topic to begin, /help for commands."
            .bright_black()
    );
    println!();

    loop {
        match rl.readline("insight> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match Command::parse(trimmed) {
                    Ok(command) => match commands::dispatch(&mut session, command).await {
                        Ok(Control::Continue) => {}
                        Ok(Control::Quit) => {
                            println!("{}", "Goodbye!".green());
                            break;
                        }
                        Err(e) => println!("{}", format!("✗ {:#}", e).red()),
                    },
                    Err(message) => println!("{}", format!("✗ {}", message).red()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C, type /quit to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("readline error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
