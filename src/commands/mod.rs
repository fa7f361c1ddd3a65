mod export;
mod history;
mod research;

use anyhow::Result;
use colored::Colorize;

use crate::session::ResearchSession;
use crate::state::Depth;

/// Names offered to readline completion.
pub const COMMAND_NAMES: &[&str] = &[
    "/depth", "/history", "/show", "/lookup", "/fetch", "/remove", "/clear",
    "/retry", "/copy", "/save", "/help", "/quit",
];

/// A parsed REPL input line. Bare text is a fresh search; everything else
/// is a slash command. Positions are 1-based as the user typed them.
#[derive(Debug, PartialEq)]
pub enum Command {
    Research(String),
    Depth(Option<Depth>),
    History,
    Show(usize),
    Lookup(LookupTarget),
    Fetch(usize),
    Remove(usize),
    Clear,
    Retry,
    Copy,
    Save(Option<String>),
    Help,
    Quit,
}

#[derive(Debug, PartialEq)]
pub enum LookupTarget {
    Index(usize),
    Topic(String),
}

/// Whether the REPL loop keeps going after a command.
pub enum Control {
    Continue,
    Quit,
}

impl Command {
    /// Parse a non-empty input line. Malformed commands come back as an
    /// Err with the message to show the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Command::Research(line.to_string()));
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or("");

        match name {
            "/depth" => {
                if arg.is_empty() {
                    return Ok(Command::Depth(None));
                }
                match Depth::parse(arg) {
                    Some(depth) => Ok(Command::Depth(Some(depth))),
                    None => Err(format!(
                        "unknown depth '{}', expected low, medium, or high",
                        arg
                    )),
                }
            }
            "/history" => Ok(Command::History),
            "/show" => parse_position(arg).map(Command::Show),
            "/lookup" => {
                if arg.is_empty() {
                    Err("usage: /lookup <position | topic>".to_string())
                } else if let Ok(n) = arg.parse::<usize>() {
                    if n == 0 {
                        Err("history positions start at 1".to_string())
                    } else {
                        Ok(Command::Lookup(LookupTarget::Index(n)))
                    }
                } else {
                    Ok(Command::Lookup(LookupTarget::Topic(arg.to_string())))
                }
            }
            "/fetch" => parse_position(arg).map(Command::Fetch),
            "/remove" => parse_position(arg).map(Command::Remove),
            "/clear" => Ok(Command::Clear),
            "/retry" => Ok(Command::Retry),
            "/copy" => Ok(Command::Copy),
            "/save" => Ok(Command::Save(if arg.is_empty() {
                None
            } else {
                Some(arg.to_string())
            })),
            "/help" => Ok(Command::Help),
            "/quit" | "/exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}', try /help", other)),
        }
    }
}

fn parse_position(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err("expected a history position, e.g. /show 1".to_string()),
    }
}

/// Route a parsed command to its handler.
pub async fn dispatch(session: &mut ResearchSession, command: Command) -> Result<Control> {
    match command {
        Command::Research(topic) => research::fresh(session, &topic).await?,
        Command::Depth(None) => {
            println!("Scan depth: {}", session.depth().to_string().bold());
        }
        Command::Depth(Some(depth)) => {
            session.set_depth(depth);
            println!("{}", format!("Scan depth set to {}", depth).green());
        }
        Command::History => history::list(session),
        Command::Show(n) => history::show(session, n),
        Command::Lookup(target) => research::lookup(session, target).await?,
        Command::Fetch(n) => research::fetch(session, n).await?,
        Command::Remove(n) => history::remove(session, n),
        Command::Clear => history::clear(session),
        Command::Retry => research::retry(session).await?,
        Command::Copy => export::copy(session),
        Command::Save(path) => export::save(session, path.as_deref()),
        Command::Help => print_help(),
        Command::Quit => return Ok(Control::Quit),
    }
    Ok(Control::Continue)
}

fn print_help() {
    println!("{}", "Commands".bold());
    println!("  <topic>            research a topic at the current depth");
    println!("  /depth [level]     show or set scan depth (low, medium, high)");
    println!("  /history           list recent research, most recent first");
    println!("  /show <n>          redisplay entry n from the local cache");
    println!("  /lookup <n|topic>  ask the backend for its cached summary");
    println!("  /fetch <n>         re-run entry n as a fresh search");
    println!("  /remove <n>        delete entry n from history");
    println!("  /clear             delete all history");
    println!("  /retry             repeat the last request");
    println!("  /copy              copy the current summary to the clipboard");
    println!("  /save [path]       write the current summary to a markdown file");
    println!("  /quit              exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_text_is_research() {
        assert_eq!(
            Command::parse("rust borrow checker"),
            Ok(Command::Research("rust borrow checker".to_string()))
        );
    }

    #[test]
    fn test_parse_depth() {
        assert_eq!(Command::parse("/depth"), Ok(Command::Depth(None)));
        assert_eq!(
            Command::parse("/depth high"),
            Ok(Command::Depth(Some(Depth::High)))
        );
        assert!(Command::parse("/depth banana").is_err());
    }

    #[test]
    fn test_parse_positions() {
        assert_eq!(Command::parse("/show 2"), Ok(Command::Show(2)));
        assert_eq!(Command::parse("/fetch 1"), Ok(Command::Fetch(1)));
        assert_eq!(Command::parse("/remove 10"), Ok(Command::Remove(10)));
        assert!(Command::parse("/show 0").is_err());
        assert!(Command::parse("/show").is_err());
        assert!(Command::parse("/remove x").is_err());
    }

    #[test]
    fn test_parse_lookup_index_or_topic() {
        assert_eq!(
            Command::parse("/lookup 3"),
            Ok(Command::Lookup(LookupTarget::Index(3)))
        );
        assert_eq!(
            Command::parse("/lookup rust async runtimes"),
            Ok(Command::Lookup(LookupTarget::Topic(
                "rust async runtimes".to_string()
            )))
        );
        assert!(Command::parse("/lookup").is_err());
        assert!(Command::parse("/lookup 0").is_err());
    }

    #[test]
    fn test_parse_save_with_and_without_path() {
        assert_eq!(Command::parse("/save"), Ok(Command::Save(None)));
        assert_eq!(
            Command::parse("/save notes/out.md"),
            Ok(Command::Save(Some("notes/out.md".to_string())))
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/history"), Ok(Command::History));
        assert_eq!(Command::parse("/clear"), Ok(Command::Clear));
        assert_eq!(Command::parse("/retry"), Ok(Command::Retry));
        assert_eq!(Command::parse("/copy"), Ok(Command::Copy));
        assert_eq!(Command::parse("/help"), Ok(Command::Help));
        assert_eq!(Command::parse("/quit"), Ok(Command::Quit));
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(Command::parse("/frobnicate").is_err());
    }
}
