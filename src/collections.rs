//! `docrag collections` and `docrag drop`.

use anyhow::Result;

use crate::config::Config;
use crate::store::{IndexStore, SqliteStore};

pub async fn run_collections(config: &Config) -> Result<()> {
    let store = SqliteStore::open_unranked(&config.store).await?;
    let infos = store.list().await;
    store.close().await;
    let infos = infos?;

    if infos.is_empty() {
        println!("No collections indexed.");
        return Ok(());
    }

    println!(
        "{:<28} {:>8}   {:<24} INDEXED",
        "COLLECTION", "CHUNKS", "EMBEDDING"
    );
    println!("{}", "-".repeat(80));
    for info in &infos {
        println!(
            "{:<28} {:>8}   {:<24} {}",
            info.name,
            info.chunk_count,
            info.embedding_model.as_deref().unwrap_or("keyword"),
            format_ts_relative(info.indexed_at)
        );
    }

    Ok(())
}

pub async fn run_drop(config: &Config, collection: &str) -> Result<()> {
    let store = SqliteStore::open_unranked(&config.store).await?;
    let existed = store.exists(collection).await?;
    store.delete(collection).await?;
    store.close().await;

    if existed {
        println!("Dropped collection '{}'.", collection);
    } else {
        println!("Collection '{}' does not exist; nothing to drop.", collection);
    }
    Ok(())
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
pub(crate) fn format_ts_relative(ts: i64) -> String {
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
