//! Error taxonomy for indexing and question answering.
//!
//! Each external collaborator gets its own error type ([`ExtractError`],
//! [`StoreError`], [`GenerationError`]); [`RagError`] is what callers of
//! [`pipeline::index`](crate::pipeline::index) and
//! [`pipeline::ask`](crate::pipeline::ask) see.

use thiserror::Error;

use crate::models::QueryState;

/// The document bytes could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// Failures reported by an [`IndexStore`](crate::store::IndexStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),
    #[error("index store database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error(
        "collection '{collection}' was indexed with embedding model '{indexed_with}' \
         but '{configured}' is configured; re-index the document"
    )]
    IncompatibleIndex {
        collection: String,
        indexed_with: String,
        configured: String,
    },
    #[error("index store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Completion service failure.
///
/// One error kind with a cause detail: [`is_transient`](Self::is_transient)
/// separates "try again later" from "fix the configuration".
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),
    #[error("completion service rejected the credential (HTTP {status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("invalid model identifier '{model}' (HTTP {status}): {body}")]
    InvalidModel {
        model: String,
        status: u16,
        body: String,
    },
    #[error("completion service rate limited the request: {0}")]
    RateLimited(String),
    #[error("completion service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },
    #[error("completion request timed out after {0}s")]
    Timeout(u64),
    #[error("could not reach completion service: {0}")]
    Network(String),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::RateLimited(_)
            | GenerationError::Timeout(_)
            | GenerationError::Network(_) => true,
            GenerationError::Service { status, .. } => *status >= 500,
            GenerationError::MissingCredential(_)
            | GenerationError::Unauthorized { .. }
            | GenerationError::InvalidModel { .. }
            | GenerationError::MalformedResponse(_) => false,
        }
    }

    /// HTTP status returned by the service, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationError::Unauthorized { status, .. }
            | GenerationError::InvalidModel { status, .. }
            | GenerationError::Service { status, .. } => Some(*status),
            GenerationError::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

/// Caller-facing error for `index` and `ask`.
#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),
    #[error("retrieval failed: {0}")]
    Retrieval(StoreError),
    #[error("indexing failed: {0}")]
    Indexing(StoreError),
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl RagError {
    /// Lifts a store error raised while answering a query.
    pub fn from_retrieval(err: StoreError) -> Self {
        match err {
            StoreError::CollectionNotFound(name) => RagError::CollectionNotFound(name),
            other => RagError::Retrieval(other),
        }
    }

    /// Query state in which this error ends a query, if it belongs to one.
    pub fn failed_state(&self) -> Option<QueryState> {
        match self {
            RagError::CollectionNotFound(_) | RagError::Retrieval(_) => {
                Some(QueryState::Retrieving)
            }
            RagError::Generation(_) => Some(QueryState::Generating),
            RagError::InvalidParameter(_) => Some(QueryState::Idle),
            RagError::Extraction(_) | RagError::Indexing(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GenerationError::RateLimited("slow down".into()).is_transient());
        assert!(GenerationError::Timeout(60).is_transient());
        assert!(GenerationError::Network("refused".into()).is_transient());
        assert!(GenerationError::Service {
            status: 503,
            body: String::new()
        }
        .is_transient());

        assert!(!GenerationError::Service {
            status: 422,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerationError::MissingCredential("GROQ_API_KEY".into()).is_transient());
        assert!(!GenerationError::Unauthorized {
            status: 401,
            body: String::new()
        }
        .is_transient());
        assert!(!GenerationError::InvalidModel {
            model: "nope".into(),
            status: 404,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn missing_collection_is_lifted_out_of_retrieval() {
        let err = RagError::from_retrieval(StoreError::CollectionNotFound("T".into()));
        assert!(matches!(err, RagError::CollectionNotFound(ref n) if n == "T"));
        assert_eq!(err.failed_state(), Some(QueryState::Retrieving));
    }

    #[test]
    fn generation_failure_ends_in_generating() {
        let err = RagError::from(GenerationError::Timeout(5));
        assert_eq!(err.failed_state(), Some(QueryState::Generating));
    }
}
