//! `docrag status`: configuration and store overview.
//!
//! Shows where the index lives, what it holds, which embedding provider and
//! completion endpoint are configured, and whether the completion credential
//! is present. The credential value itself is never printed.

use anyhow::Result;

use crate::config::{CompletionApi, Config};
use crate::store::{IndexStore, SqliteStore};

pub async fn run_status(config: &Config) -> Result<()> {
    let store_path = &config.store.path;

    println!("docrag status");
    println!("=============");
    println!();
    println!("  Store:        {}", store_path.display());

    if store_path.exists() {
        let size = std::fs::metadata(store_path).map(|m| m.len()).unwrap_or(0);
        let store = SqliteStore::open_unranked(&config.store).await?;
        let infos = store.list().await;
        store.close().await;
        let infos = infos?;
        let chunks: i64 = infos.iter().map(|i| i.chunk_count).sum();

        println!("  Size:         {}", format_bytes(size));
        println!("  Collections:  {}", infos.len());
        println!("  Chunks:       {}", chunks);
    } else {
        println!("  (not initialized, run `docrag init`)");
    }

    println!();
    let embedding = &config.embedding;
    match (&embedding.model, embedding.is_enabled()) {
        (Some(model), true) => println!("  Embedding:    {} ({})", embedding.provider, model),
        (None, true) => println!("  Embedding:    {}", embedding.provider),
        (_, false) => println!("  Embedding:    disabled (keyword ranking)"),
    }

    let completion = &config.completion;
    let api = match completion.api {
        CompletionApi::Chat => "chat",
        CompletionApi::Responses => "responses",
    };
    println!("  Completion:   {} [{}]", completion.base_url, api);
    println!("  Model:        {}", completion.model);
    println!(
        "  Credential:   {} ({})",
        completion.api_key_env,
        if credential_present(&completion.api_key_env) {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!();

    Ok(())
}

fn credential_present(var: &str) -> bool {
    std::env::var(var)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
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
