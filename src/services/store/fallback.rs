//! Try-primary-then-fallback storage discipline.

use async_trait::async_trait;

use super::{ChunkStore, InMemoryStore, StorageType, StoreReceipt, StoreStats};
use crate::error::StoreError;
use crate::models::{DocumentChunk, ScoredChunk};

/// Decorator that routes every operation to the durable primary first and
/// transparently re-runs it against the in-memory fallback when the primary
/// fails. The two backends are never merged: data written to the fallback
/// during an outage stays there even after the primary recovers.
///
/// A failure of the fallback itself is fatal and propagates.
pub struct FallbackStore {
    primary: Option<Box<dyn ChunkStore>>,
    fallback: InMemoryStore,
}

impl FallbackStore {
    /// Both backends are injected; the caller owns their lifecycle.
    pub fn new(primary: Box<dyn ChunkStore>, fallback: InMemoryStore) -> Self {
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// No durable backend configured; everything lives in memory.
    pub fn memory_only(fallback: InMemoryStore) -> Self {
        Self {
            primary: None,
            fallback,
        }
    }

    fn log_fallback(&self, operation: &str, error: &StoreError) {
        tracing::warn!(
            operation,
            %error,
            "primary store failed, falling back to in-memory"
        );
    }
}

#[async_trait]
impl ChunkStore for FallbackStore {
    async fn store_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<StoreReceipt, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.store_chunks(chunks.clone()).await {
                Ok(receipt) => return Ok(receipt),
                Err(error) => self.log_fallback("store_chunks", &error),
            }
        }
        self.fallback.store_chunks(chunks).await
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.search_similar(query_embedding, top_k, threshold).await {
                Ok(results) => return Ok(results),
                Err(error) => self.log_fallback("search_similar", &error),
            }
        }
        self.fallback
            .search_similar(query_embedding, top_k, threshold)
            .await
    }

    async fn get_document_chunks(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.get_document_chunks(document_id).await {
                Ok(chunks) => return Ok(chunks),
                Err(error) => self.log_fallback("get_document_chunks", &error),
            }
        }
        self.fallback.get_document_chunks(document_id).await
    }

    async fn delete_document_chunks(&self, document_id: &str) -> Result<u64, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.delete_document_chunks(document_id).await {
                Ok(count) => {
                    // The fallback may hold chunks written during an outage
                    let fallback_count = self.fallback.delete_document_chunks(document_id).await?;
                    return Ok(count + fallback_count);
                }
                Err(error) => self.log_fallback("delete_document_chunks", &error),
            }
        }
        self.fallback.delete_document_chunks(document_id).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        if let Some(primary) = &self.primary {
            match primary.clear().await {
                Ok(()) => return self.fallback.clear().await,
                Err(error) => self.log_fallback("clear", &error),
            }
        }
        self.fallback.clear().await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.stats().await {
                Ok(stats) => return Ok(stats),
                Err(error) => self.log_fallback("stats", &error),
            }
        }
        self.fallback.stats().await
    }

    fn storage_type(&self) -> StorageType {
        self.primary
            .as_ref()
            .map_or(StorageType::InMemory, |p| p.storage_type())
    }
}
