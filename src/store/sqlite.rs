//! Persistent [`IndexStore`] on SQLite.
//!
//! Collections live in four tables: `collections` (one row per name),
//! `chunks`, `chunk_vectors` (little-endian f32 BLOBs) and the FTS5 index
//! `chunks_fts`. Relevance is cosine similarity over stored vectors when the
//! collection was indexed with an embedding provider, BM25 keyword rank
//! otherwise. Keyword ranking pads its result with the remaining chunks in
//! document order, so either way a query returns `min(k, chunk_count)` texts.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{query_terms, IndexStore};
use crate::config::{Config, StoreConfig};
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::StoreError;
use crate::migrate;
use crate::models::{Chunk, CollectionInfo};

pub struct SqliteStore {
    pool: SqlitePool,
    embedder: Option<Box<dyn EmbeddingProvider>>,
    batch_size: usize,
}

impl SqliteStore {
    /// Connect, create the schema if needed, and set up the configured
    /// embedding provider.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let embedder = if config.embedding.is_enabled() {
            Some(embedding::create_provider(&config.embedding).map_err(StoreError::Embedding)?)
        } else {
            None
        };
        let pool = db::connect(&config.store).await?;
        migrate::run_migrations(&pool).await?;
        tracing::debug!(
            path = %config.store.path.display(),
            embedder = embedder.as_ref().map(|p| p.model_name()).unwrap_or("disabled"),
            "index store opened"
        );
        Ok(Self::with_provider(pool, embedder, config.embedding.batch_size))
    }

    /// Open without an embedding provider, for listing and dropping
    /// collections. Queries against vector-indexed collections fail with
    /// [`StoreError::IncompatibleIndex`].
    pub async fn open_unranked(store: &StoreConfig) -> Result<Self, StoreError> {
        let pool = db::connect(store).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::with_provider(pool, None, 1))
    }

    /// Wrap an already-migrated pool. `embedder = None` selects keyword ranking.
    pub fn with_provider(
        pool: SqlitePool,
        embedder: Option<Box<dyn EmbeddingProvider>>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            embedder,
            batch_size,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn embedder_name(&self) -> &str {
        self.embedder
            .as_ref()
            .map(|p| p.model_name())
            .unwrap_or("disabled")
    }

    async fn vector_query(
        &self,
        provider: &dyn EmbeddingProvider,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<String>, StoreError> {
        let query_vec = embedding::embed_query(provider, query_text)
            .await
            .map_err(StoreError::Embedding)?;

        let rows = sqlx::query(
            r#"
            SELECT c.chunk_index, c.text, v.embedding
            FROM chunks c
            JOIN chunk_vectors v ON v.collection = c.collection AND v.chunk_id = c.chunk_id
            WHERE c.collection = ?
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, i64, String)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let similarity =
                    embedding::cosine_similarity(&query_vec, &embedding::blob_to_vec(&blob));
                (similarity, row.get("chunk_index"), row.get("text"))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        Ok(scored.into_iter().take(k).map(|(_, _, text)| text).collect())
    }

    /// BM25 matches first, then every other chunk in document order.
    async fn keyword_query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut terms = query_terms(query_text);
        terms.sort();
        terms.dedup();

        if terms.is_empty() {
            let rows = sqlx::query(
                "SELECT text FROM chunks WHERE collection = ? ORDER BY chunk_index LIMIT ?",
            )
            .bind(collection)
            .bind(sql_limit(k))
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.iter().map(|row| row.get("text")).collect());
        }

        // Quote every term so FTS5 operators in user input are inert.
        let match_expr = terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR ");

        let rows = sqlx::query(
            r#"
            SELECT c.text
            FROM chunks c
            LEFT JOIN (
                SELECT chunk_id, rank
                FROM chunks_fts
                WHERE chunks_fts MATCH ? AND collection = ?
            ) m ON m.chunk_id = c.chunk_id
            WHERE c.collection = ?
            ORDER BY m.rank IS NULL, m.rank, c.chunk_index
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(collection)
        .bind(collection)
        .bind(sql_limit(k))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("text")).collect())
    }
}

/// SQLite `LIMIT` is a signed 64-bit integer; larger requests mean "all rows".
fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl IndexStore for SqliteStore {
    async fn create_or_replace(
        &self,
        collection: &str,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        // Embed before touching the old collection so a failure leaves it intact.
        let vectors = match &self.embedder {
            Some(provider) if !chunks.is_empty() => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let vectors = embedding::embed_batched(provider.as_ref(), &texts, self.batch_size)
                    .await
                    .map_err(StoreError::Embedding)?;
                Some(vectors)
            }
            _ => None,
        };
        let (model, dims) = match &self.embedder {
            Some(p) => (Some(p.model_name().to_string()), Some(p.dims() as i64)),
            None => (None, None),
        };

        let mut tx = self.pool.begin().await?;

        for table in ["chunk_vectors", "chunks_fts", "chunks"] {
            sqlx::query(&format!("DELETE FROM {} WHERE collection = ?", table))
                .bind(collection)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO collections (name, chunk_count, embedding_model, embedding_dims, indexed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                chunk_count = excluded.chunk_count,
                embedding_model = excluded.embedding_model,
                embedding_dims = excluded.embedding_dims,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(collection)
        .bind(chunks.len() as i64)
        .bind(&model)
        .bind(dims)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        for (i, chunk) in chunks.iter().enumerate() {
            sqlx::query(
                "INSERT INTO chunks (collection, chunk_id, chunk_index, text) VALUES (?, ?, ?, ?)",
            )
            .bind(collection)
            .bind(&chunk.id)
            .bind(chunk.index)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO chunks_fts (collection, chunk_id, text) VALUES (?, ?, ?)")
                .bind(collection)
                .bind(&chunk.id)
                .bind(&chunk.text)
                .execute(&mut *tx)
                .await?;

            if let Some(vectors) = &vectors {
                sqlx::query(
                    "INSERT INTO chunk_vectors (collection, chunk_id, embedding) VALUES (?, ?, ?)",
                )
                .bind(collection)
                .bind(&chunk.id)
                .bind(embedding::vec_to_blob(&vectors[i]))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::debug!(collection, chunks = chunks.len(), "collection replaced");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<String>, StoreError> {
        let indexed_with: Option<Option<String>> =
            sqlx::query_scalar("SELECT embedding_model FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        let indexed_with =
            indexed_with.ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        if k == 0 {
            return Ok(Vec::new());
        }

        match (indexed_with, &self.embedder) {
            (None, _) => self.keyword_query(collection, query_text, k).await,
            (Some(model), Some(provider)) if model == provider.model_name() => {
                self.vector_query(provider.as_ref(), collection, query_text, k)
                    .await
            }
            (Some(model), _) => Err(StoreError::IncompatibleIndex {
                collection: collection.to_string(),
                indexed_with: model,
                configured: self.embedder_name().to_string(),
            }),
        }
    }

    async fn exists(&self, collection: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn delete(&self, collection: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for table in ["chunk_vectors", "chunks_fts", "chunks"] {
            sqlx::query(&format!("DELETE FROM {} WHERE collection = ?", table))
                .bind(collection)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, chunk_count, embedding_model, indexed_at FROM collections ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CollectionInfo {
                name: row.get("name"),
                chunk_count: row.get("chunk_count"),
                embedding_model: row.get("embedding_model"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }
}
