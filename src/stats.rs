//! Dictionary and cache overview.
//!
//! Used by `wordshape stats`. Reads what the manager and the cache already
//! know; never triggers a download.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::dictionary::{DictionaryManager, DictionaryStats};
use crate::progress::format_number;

/// Run the stats command: inspect the cache and print a summary.
pub async fn run_stats(config: &Config, json: bool) -> Result<()> {
    let manager = DictionaryManager::open(config).await?;
    let stats = manager.stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print!("{}", render(config, &stats, Utc::now()));
    Ok(())
}

fn render(config: &Config, stats: &DictionaryStats, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("Wordshape — Dictionary Stats\n");
    out.push_str("============================\n\n");
    out.push_str(&format!("  Cache:       {}\n", config.cache.path.display()));
    out.push_str(&format!(
        "  Size:        {}\n",
        format_bytes(stats.cache_size_bytes)
    ));
    out.push_str(&format!(
        "  Entry:       {}\n",
        match (stats.cached_words, stats.cache_valid) {
            (None, _) => "none".to_string(),
            (Some(n), true) => format!("{} words, fresh", format_number(n as u64)),
            (Some(n), false) => format!("{} words, expired", format_number(n as u64)),
        }
    ));
    out.push_str(&format!(
        "  Loaded:      {}\n",
        stats
            .loaded_at
            .map(|ts| format_ts_relative(ts, now))
            .unwrap_or_else(|| "never".to_string())
    ));
    out.push_str(&format!("  Source:      {}\n", stats.source));
    out.push_str(&format!("  Status:      {}\n", stats.status));
    out.push('\n');
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
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

/// Relative time string (e.g. "3 hours ago"); falls back to a date for
/// future or old timestamps.
fn format_ts_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

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

fn format_ts_iso(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}
