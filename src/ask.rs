//! `docrag ask`: answer a question from an indexed collection.

use anyhow::Result;

use crate::completion::OpenAiCompatibleClient;
use crate::config::Config;
use crate::error::RagError;
use crate::models::RagParams;
use crate::pipeline;
use crate::store::SqliteStore;

pub async fn run_ask(
    config: &Config,
    question: &str,
    collection: Option<String>,
    k: Option<usize>,
    model: Option<String>,
    show_context: bool,
) -> Result<()> {
    let params = RagParams::from_config(config).with_overrides(collection, None, k, model);

    let store = SqliteStore::open(config).await?;
    let client = OpenAiCompatibleClient::from_config(&config.completion)?;
    let result = pipeline::ask(&store, &client, question, &params).await;
    store.close().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(RagError::Generation(e)) => {
            let hint = if e.is_transient() {
                "temporary failure, try again later"
            } else {
                "check the [completion] configuration and credential"
            };
            return Err(anyhow::Error::new(e).context(format!("Completion failed ({})", hint)));
        }
        Err(e) => return Err(e.into()),
    };

    if show_context {
        println!("Context ({} chunks from '{}'):", outcome.chunks.len(), params.collection);
        for (i, chunk) in outcome.chunks.iter().enumerate() {
            println!("--- [{}] ---", i + 1);
            println!("{}", chunk);
        }
        println!("---");
        println!();
    }

    println!("{}", outcome.answer);
    if outcome.insufficient_context {
        tracing::info!(collection = %params.collection, "model reported insufficient context");
    }

    Ok(())
}
