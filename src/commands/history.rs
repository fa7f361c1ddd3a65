use chrono::{DateTime, Utc};
use colored::Colorize;

use super::research::print_result;
use crate::session::ResearchSession;

/// List cached records, most recent first.
pub fn list(session: &ResearchSession) {
    let records = session.history().records();
    if records.is_empty() {
        println!("{}", "No recent searches".italic());
        return;
    }
    println!("{}", "Recent Research".bold());
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            record.topic,
            format!("({} depth, {})", record.depth, age(record.created_at)).bright_black()
        );
    }
}

/// Redisplay a cached record without touching the network.
pub fn show(session: &mut ResearchSession, n: usize) {
    match session.restore(n - 1) {
        Some(result) => {
            // restore() hands back a borrow of the session result; clone so
            // the view does not hold the session.
            let result = result.clone();
            print_result(&result);
        }
        None => println!("{}", format!("No history entry at position {}", n).red()),
    }
}

/// Delete one record.
pub fn remove(session: &mut ResearchSession, n: usize) {
    match session.history_mut().remove(n - 1) {
        Ok(record) => {
            println!(
                "{}",
                format!("Removed '{}' from history", record.topic).green()
            );
        }
        Err(e) => println!("{}", format!("✗ {:#}", e).red()),
    }
}

/// Delete all records and the persisted file.
pub fn clear(session: &mut ResearchSession) {
    if session.history().is_empty() {
        println!("{}", "History is already empty".bright_black());
        return;
    }
    match session.history_mut().clear() {
        Ok(()) => println!("{}", "History cleared".green()),
        Err(e) => println!("{}", format!("✗ {:#}", e).red()),
    }
}

fn age(created_at: DateTime<Utc>) -> String {
    let minutes = (Utc::now() - created_at).num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 60 * 24 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / (60 * 24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_age_buckets() {
        let now = Utc::now();
        assert_eq!(age(now), "just now");
        assert_eq!(age(now - Duration::minutes(5)), "5m ago");
        assert_eq!(age(now - Duration::hours(3)), "3h ago");
        assert_eq!(age(now - Duration::days(2)), "2d ago");
    }
}
