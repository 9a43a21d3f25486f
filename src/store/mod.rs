//! Index store abstraction.
//!
//! The [`IndexStore`] trait is the boundary to whatever holds collections and
//! answers similarity queries. [`SqliteStore`] persists to disk;
//! [`InMemoryStore`] is for tests and embedding in other programs.
//!
//! A store handle is meant to be created once per process and shared
//! (`Arc<dyn IndexStore>` or a plain reference). Every operation is keyed by
//! its explicit collection name; there is no "current collection".
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`create_or_replace`](IndexStore::create_or_replace) | Destroy any collection of that name and store the given chunks |
//! | [`query`](IndexStore::query) | Up to `k` chunk texts, most relevant first |
//! | [`exists`](IndexStore::exists) | Whether a collection of that name exists |
//! | [`delete`](IndexStore::delete) | Remove a collection; no error if absent |
//! | [`list`](IndexStore::list) | Summaries of all collections |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Chunk, CollectionInfo};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Replace the named collection with exactly `chunks`, addressed by their ids.
    ///
    /// The previous collection is discarded even if `chunks` is shorter.
    /// A missing previous collection is not an error.
    async fn create_or_replace(&self, collection: &str, chunks: &[Chunk])
        -> Result<(), StoreError>;

    /// Up to `k` chunk texts ordered by descending relevance to `query_text`.
    ///
    /// Fails with [`StoreError::CollectionNotFound`] when the collection does
    /// not exist; an existing empty collection yields an empty vector.
    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<String>, StoreError>;

    async fn exists(&self, collection: &str) -> Result<bool, StoreError>;

    /// Remove the named collection. Idempotent.
    async fn delete(&self, collection: &str) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<CollectionInfo>, StoreError>;
}

/// Lowercased alphanumeric terms of `text`, in order, duplicates kept.
pub(crate) fn query_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
