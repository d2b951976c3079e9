//! Reference statistics and the listing commands built on them.
//!
//! Used by `refs stats`, `refs authors` and `refs years` to show what the
//! engine can see across every available source.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::search::SearchEngine;

/// Run the stats command: aggregate every reference and print a summary.
pub async fn run_stats(engine: &SearchEngine, json: bool) -> Result<()> {
    let stats = engine.stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("refharness — Reference Stats");
    println!("============================");
    println!();
    println!("  References:  {}", stats.total);

    print_breakdown("By source", &stats.by_source, stats.total);
    print_breakdown("By type", &stats.by_type, stats.total);
    print_breakdown("By year", &stats.by_year, stats.total);
    print_breakdown("By author", &stats.by_author, stats.total);

    println!();
    Ok(())
}

pub async fn run_authors(engine: &SearchEngine) -> Result<()> {
    let authors = engine.authors().await;
    if authors.is_empty() {
        println!("No authors found.");
    }
    for author in authors {
        println!("{}", author);
    }
    Ok(())
}

pub async fn run_years(engine: &SearchEngine) -> Result<()> {
    let years = engine.years().await;
    if years.is_empty() {
        println!("No years found.");
    }
    for year in years {
        println!("{}", year);
    }
    Ok(())
}

/// Print one breakdown, largest bucket first.
fn print_breakdown(heading: &str, counts: &BTreeMap<String, usize>, total: usize) {
    if counts.is_empty() {
        return;
    }
    let mut rows: Vec<(&String, &usize)> = counts.iter().collect();
    rows.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    println!();
    println!("  {}:", heading);
    for (key, count) in rows {
        println!("  {:<32} {:>6} {:>5}%", key, count, percent(*count, total));
    }
}

fn percent(part: usize, total: usize) -> usize {
    if total > 0 {
        part * 100 / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
pub fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
