//! In-memory [`IndexStore`] for tests and embedding.
//!
//! Nothing is persisted. Relevance is term overlap between the query and a
//! chunk (distinct query terms found in the chunk), ties broken by chunk
//! order, so results are deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{query_terms, IndexStore};
use crate::error::StoreError;
use crate::models::{Chunk, CollectionInfo};

struct StoredCollection {
    chunks: Vec<Chunk>,
    indexed_at: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, StoredCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking writer cannot leave a collection half-replaced (the map
    // entry is swapped in one insert), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredCollection>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredCollection>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn overlap_score(terms: &HashSet<String>, text: &str) -> usize {
    let chunk_terms: HashSet<String> = query_terms(text).into_iter().collect();
    terms.intersection(&chunk_terms).count()
}

#[async_trait]
impl IndexStore for InMemoryStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        let stored = StoredCollection {
            chunks: chunks.to_vec(),
            indexed_at: chrono::Utc::now().timestamp(),
        };
        self.write().insert(collection.to_string(), stored);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<String>, StoreError> {
        let collections = self.read();
        let stored = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let terms: HashSet<String> = query_terms(query_text).into_iter().collect();
        let mut scored: Vec<(usize, &Chunk)> = stored
            .chunks
            .iter()
            .map(|c| (overlap_score(&terms, &c.text), c))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.index.cmp(&b.1.index)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, c)| c.text.clone())
            .collect())
    }

    async fn exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.read().contains_key(collection))
    }

    async fn delete(&self, collection: &str) -> Result<(), StoreError> {
        self.write().remove(collection);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        let mut infos: Vec<CollectionInfo> = self
            .read()
            .iter()
            .map(|(name, stored)| CollectionInfo {
                name: name.clone(),
                chunk_count: stored.chunks.len() as i64,
                embedding_model: None,
                indexed_at: stored.indexed_at,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }
}
