//! Typed accessor over [`IndexStore::query`].
//!
//! No re-ranking or filtering happens here: order and text come straight
//! from the store. What this layer adds is parameter validation, the
//! `k` upper bound, and the lift of "collection missing" into
//! [`RagError::CollectionNotFound`].

use crate::error::RagError;
use crate::models::RetrievalResult;
use crate::store::IndexStore;

pub async fn retrieve(
    store: &dyn IndexStore,
    collection: &str,
    query: &str,
    k: usize,
) -> Result<RetrievalResult, RagError> {
    if k == 0 {
        return Err(RagError::InvalidParameter("k must be greater than 0".into()));
    }

    let mut chunks = store
        .query(collection, query, k)
        .await
        .map_err(RagError::from_retrieval)?;
    chunks.truncate(k);

    tracing::debug!(collection, k, returned = chunks.len(), "retrieved chunks");
    Ok(RetrievalResult { chunks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn k_larger_than_collection_returns_everything_once() {
        let store = InMemoryStore::new();
        store
            .create_or_replace("c", &chunk_text("abcdefghij", 3))
            .await
            .unwrap();

        let result = retrieve(&store, "c", "anything", 100).await.unwrap();
        assert_eq!(result.len(), 4);
        let mut sorted = result.chunks.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
    }

    #[tokio::test]
    async fn oversized_k_on_sqlite_returns_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::store::SqliteStore::open_unranked(&crate::config::StoreConfig {
            path: dir.path().join("store.sqlite"),
            max_connections: 1,
        })
        .await
        .unwrap();
        store
            .create_or_replace("c", &chunk_text("abcdefghijkl", 3))
            .await
            .unwrap();

        let result = retrieve(&store, "c", "abc", 1 << 40).await.unwrap();
        assert_eq!(result.chunks, vec!["abc", "def", "ghi", "jkl"]);
        let result = retrieve(&store, "c", "abc", usize::MAX).await.unwrap();
        assert_eq!(result.len(), 4);
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = InMemoryStore::new();
        let err = retrieve(&store, "T", "X?", 3).await.unwrap_err();
        assert!(matches!(err, RagError::CollectionNotFound(ref n) if n == "T"));
    }

    #[tokio::test]
    async fn empty_collection_is_empty_result() {
        let store = InMemoryStore::new();
        store.create_or_replace("T", &[]).await.unwrap();
        assert!(retrieve(&store, "T", "X?", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_k_is_rejected() {
        let store = InMemoryStore::new();
        store.create_or_replace("T", &[]).await.unwrap();
        assert!(matches!(
            retrieve(&store, "T", "X?", 0).await,
            Err(RagError::InvalidParameter(_))
        ));
    }
}
