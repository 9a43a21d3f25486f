//! `docrag index`: read a document from disk and index it as a collection.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::extract;
use crate::models::RagParams;
use crate::pipeline;
use crate::store::SqliteStore;

pub async fn run_index(
    config: &Config,
    file: &Path,
    collection: Option<String>,
    chunk_size: Option<usize>,
    content_type: Option<String>,
) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let content_type = match content_type {
        Some(ct) => ct,
        None => extract::detect_content_type(Some(file), &bytes)
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "Could not detect the document type of {}. Pass --content-type.",
                    file.display()
                )
            })?,
    };

    let params = RagParams::from_config(config).with_overrides(collection, chunk_size, None, None);

    let store = SqliteStore::open(config).await?;
    let result = pipeline::index(&store, &bytes, &content_type, &params).await;
    store.close().await;
    let count = result.with_context(|| format!("Failed to index {}", file.display()))?;

    if count == 0 {
        println!(
            "Warning: no text could be extracted from {}. Collection '{}' was not created or replaced.",
            file.display(),
            params.collection
        );
    } else {
        println!(
            "Indexed {} into collection '{}': {} chunks of up to {} characters.",
            file.display(),
            params.collection,
            count,
            params.chunk_size
        );
    }

    Ok(())
}
