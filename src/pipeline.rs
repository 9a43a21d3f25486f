//! Indexing and question answering, end to end.
//!
//! ```text
//! index: bytes ─► extract ─► join pages ─► chunk ─► store.create_or_replace
//! ask:   question ─► retrieve ─► build_prompt ─► complete ─► AskOutcome
//! ```
//!
//! Both functions take the store and completion client explicitly and are
//! parameterized only by [`RagParams`], so calls against different
//! collections never observe each other.

use crate::chunk;
use crate::completion::CompletionService;
use crate::error::RagError;
use crate::models::{AskOutcome, QueryState, RagParams};
use crate::prompt;
use crate::retrieve;
use crate::store::IndexStore;

/// Extract, chunk and store a document as `params.collection`.
///
/// Returns the number of chunks stored. When the document yields no text the
/// result is `0` and the store is left untouched: an existing collection of
/// that name keeps its previous contents.
///
/// Re-indexing a collection while an `ask` against it is in flight has no
/// ordering guarantee; callers that need one must serialize the two.
pub async fn index(
    store: &dyn IndexStore,
    bytes: &[u8],
    content_type: &str,
    params: &RagParams,
) -> Result<usize, RagError> {
    if params.chunk_size == 0 {
        return Err(RagError::InvalidParameter(
            "chunk_size must be greater than 0".into(),
        ));
    }
    validate_collection(&params.collection)?;

    let chunks = chunk::chunk_document(bytes, content_type, params.chunk_size)?;
    if chunks.is_empty() {
        tracing::warn!(
            collection = %params.collection,
            "document has no extractable text, collection not replaced"
        );
        return Ok(0);
    }

    store
        .create_or_replace(&params.collection, &chunks)
        .await
        .map_err(RagError::Indexing)?;

    tracing::info!(
        collection = %params.collection,
        chunks = chunks.len(),
        chunk_size = params.chunk_size,
        "indexed document"
    );
    Ok(chunks.len())
}

/// Answer `question` from the chunks of `params.collection`.
///
/// A missing collection fails in `Retrieving` and the completion service is
/// never called. An existing empty collection is not an error: the prompt is
/// built with an empty context.
pub async fn ask(
    store: &dyn IndexStore,
    completion: &dyn CompletionService,
    question: &str,
    params: &RagParams,
) -> Result<AskOutcome, RagError> {
    let mut state = QueryState::Idle;
    let outcome = run_query(store, completion, question, params, &mut state).await;
    match &outcome {
        Ok(_) => transition(&mut state, QueryState::Done),
        Err(e) => {
            tracing::debug!(from = %state, error = %e, "query failed");
            transition(&mut state, QueryState::Failed);
        }
    }
    outcome
}

async fn run_query(
    store: &dyn IndexStore,
    completion: &dyn CompletionService,
    question: &str,
    params: &RagParams,
    state: &mut QueryState,
) -> Result<AskOutcome, RagError> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidParameter("question must not be empty".into()));
    }
    if params.model.trim().is_empty() {
        return Err(RagError::InvalidParameter("model must not be empty".into()));
    }
    validate_collection(&params.collection)?;

    transition(state, QueryState::Retrieving);
    let retrieved = retrieve::retrieve(store, &params.collection, question, params.k).await?;

    transition(state, QueryState::Prompting);
    let prompt = prompt::build_prompt(&retrieved.chunks, question);

    transition(state, QueryState::Generating);
    let completion = completion.complete(&prompt, &params.model).await?;

    let insufficient_context = prompt::is_fallback(&completion.answer);
    Ok(AskOutcome {
        answer: completion.answer,
        chunks: retrieved.chunks,
        insufficient_context,
    })
}

fn transition(state: &mut QueryState, next: QueryState) {
    tracing::debug!(from = %state, to = %next, "query state");
    *state = next;
}

fn validate_collection(name: &str) -> Result<(), RagError> {
    if name.trim().is_empty() {
        return Err(RagError::InvalidParameter(
            "collection name must not be empty".into(),
        ));
    }
    Ok(())
}
