use std::path::PathBuf;

use colored::Colorize;

use crate::session::ResearchSession;

/// Copy the current summary to the system clipboard.
pub fn copy(session: &ResearchSession) {
    let Some(result) = session.result() else {
        println!("{}", "Nothing to copy yet, run a search first".yellow());
        return;
    };
    let copied = arboard::Clipboard::new().and_then(|mut clipboard| {
        clipboard.set_text(result.summary.clone())
    });
    match copied {
        Ok(()) => println!("{}", "Summary copied to clipboard".green()),
        Err(e) => println!("{}", format!("✗ clipboard unavailable: {}", e).red()),
    }
}

/// Write the current summary to a markdown file, deriving a filename from
/// the topic when none is given.
pub fn save(session: &ResearchSession, path: Option<&str>) {
    let Some(result) = session.result() else {
        println!("{}", "Nothing to save yet, run a search first".yellow());
        return;
    };
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(default_filename(&result.topic)),
    };
    let content = format!(
        "# {}\n\n*{} depth, generated {}*\n\n{}\n",
        result.topic,
        result.depth,
        result.created_at.format("%Y-%m-%d %H:%M UTC"),
        result.summary.trim_end()
    );
    match std::fs::write(&path, content) {
        Ok(()) => println!("{}", format!("Saved to {}", path.display()).green()),
        Err(e) => {
            println!(
                "{}",
                format!("✗ failed to write {}: {}", path.display(), e).red()
            );
        }
    }
}

/// Derive a filesystem-safe filename from the topic.
fn default_filename(topic: &str) -> String {
    let mut slug = String::new();
    for c in topic.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "summary.md".to_string()
    } else {
        format!("{}.md", slug)
    }
}
