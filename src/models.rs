//! Core data types that flow through indexing and question answering.

use serde::Serialize;

use crate::config::Config;

/// A fixed-size slice of a document's extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier within its collection: `chunk_<index>`.
    pub id: String,
    /// Zero-based position in the document.
    pub index: i64,
    pub text: String,
}

/// Per-call parameters for `index` and `ask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagParams {
    pub collection: String,
    /// Characters per chunk (indexing only).
    pub chunk_size: usize,
    /// Number of chunks to retrieve (querying only).
    pub k: usize,
    /// Completion model identifier (querying only).
    pub model: String,
}

impl RagParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            collection: config.retrieval.collection.clone(),
            chunk_size: config.chunking.chunk_size,
            k: config.retrieval.k,
            model: config.completion.model.clone(),
        }
    }

    /// Replace any field for which an override is given.
    pub fn with_overrides(
        mut self,
        collection: Option<String>,
        chunk_size: Option<usize>,
        k: Option<usize>,
        model: Option<String>,
    ) -> Self {
        if let Some(c) = collection {
            self.collection = c;
        }
        if let Some(s) = chunk_size {
            self.chunk_size = s;
        }
        if let Some(k) = k {
            self.k = k;
        }
        if let Some(m) = model {
            self.model = m;
        }
        self
    }
}

/// Chunk texts returned for a query, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Text extracted from a completion service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResult {
    pub answer: String,
}

/// Result of a successful `ask`.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    /// The context chunks handed to the model, in retrieval order.
    pub chunks: Vec<String>,
    /// The model replied with the exact fallback sentence.
    pub insufficient_context: bool,
}

/// Summary row for a stored collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub chunk_count: i64,
    /// Embedding model used at index time; `None` for keyword-ranked collections.
    pub embedding_model: Option<String>,
    /// Unix timestamp of the indexing operation that created the collection.
    pub indexed_at: i64,
}

/// States of a single `ask` invocation.
///
/// `Idle → Retrieving → Prompting → Generating → Done`, with `Failed`
/// reachable from `Retrieving` and `Generating`. There is no retry edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Retrieving,
    Prompting,
    Generating,
    Done,
    Failed,
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryState::Idle => "idle",
            QueryState::Retrieving => "retrieving",
            QueryState::Prompting => "prompting",
            QueryState::Generating => "generating",
            QueryState::Done => "done",
            QueryState::Failed => "failed",
        };
        f.write_str(s)
    }
}
