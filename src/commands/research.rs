use anyhow::Result;
use colored::Colorize;

use super::LookupTarget;
use crate::render::render_markdown;
use crate::session::{Outcome, ResearchSession};
use crate::state::{Depth, Phase, SessionResult};

/// Run a fresh search for a topic at the session's current depth.
pub async fn fresh(session: &mut ResearchSession, topic: &str) -> Result<()> {
    let depth = session.depth();
    announce("Researching", topic, depth);
    let outcome = session.fresh_search(topic, depth).await?;
    report(session, outcome);
    Ok(())
}

/// Ask the backend for its cached summary, by history position or topic.
pub async fn lookup(session: &mut ResearchSession, target: LookupTarget) -> Result<()> {
    let (topic, depth) = match target {
        LookupTarget::Index(n) => match session.history().get(n - 1) {
            Some(record) => (record.topic.clone(), record.depth),
            None => {
                println!("{}", format!("No history entry at position {}", n).red());
                return Ok(());
            }
        },
        LookupTarget::Topic(topic) => (topic, session.depth()),
    };
    announce("Looking up cached summary for", &topic, depth);
    let outcome = session.cached_load(&topic, depth).await?;
    report(session, outcome);
    Ok(())
}

/// Re-run a history entry as a fresh search.
pub async fn fetch(session: &mut ResearchSession, n: usize) -> Result<()> {
    let (topic, depth) = match session.history().get(n - 1) {
        Some(record) => (record.topic.clone(), record.depth),
        None => {
            println!("{}", format!("No history entry at position {}", n).red());
            return Ok(());
        }
    };
    announce("Researching", &topic, depth);
    let outcome = session.fresh_search(&topic, depth).await?;
    report(session, outcome);
    Ok(())
}

/// Repeat the last submission with the same parameters.
pub async fn retry(session: &mut ResearchSession) -> Result<()> {
    println!("{}", "Retrying last request...".bright_black());
    let outcome = session.retry().await?;
    report(session, outcome);
    Ok(())
}

fn announce(verb: &str, topic: &str, depth: Depth) {
    println!(
        "{}",
        format!("{} '{}' at {} depth...", verb, topic, depth).bright_black()
    );
}

/// Print the result view or the error banner for a finished request.
fn report(session: &ResearchSession, outcome: Outcome) {
    match outcome {
        Outcome::Success { storage_warning } => {
            if let Some(result) = session.result() {
                print_result(result);
            }
            if let Some(warning) = storage_warning {
                println!("{}", format!("⚠ {}", warning).yellow());
            }
        }
        Outcome::Failed => {
            if let Phase::Error { message } = &session.state().phase {
                println!("{}", format!("✗ {}", message).red());
                println!("{}", "Use /retry to try again.".bright_black());
            }
        }
        Outcome::Stale => {}
    }
}

/// The result view: header, rendered summary, verification note.
pub(super) fn print_result(result: &SessionResult) {
    println!();
    println!("{}", "Research Results".bold().underline());
    println!(
        "{}",
        format!(
            "{} | {} depth | generated {}",
            result.topic,
            result.depth,
            result.created_at.format("%Y-%m-%d %H:%M UTC")
        )
        .bright_black()
    );
    println!();
    print!("{}", render_markdown(&result.summary));
    println!();
    println!(
        "{}",
        "Synthesized from live web sources. Verify critical details before relying on them."
            .bright_black()
    );
}
