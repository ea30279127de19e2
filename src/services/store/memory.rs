//! Process-local chunk storage.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    ChunkStore, StorageType, StoreReceipt, StoreStats, cosine_similarity, partition_consistent,
    sort_ranked,
};
use crate::error::StoreError;
use crate::models::{DocumentChunk, ScoredChunk};

struct StoredChunk {
    chunk: DocumentChunk,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

/// In-memory chunk store, used directly in tests and as the transparent
/// fallback when the durable backend is unreachable.
///
/// An explicit instance owned by its caller, never a process-wide singleton,
/// so isolated corpora can coexist in one process. Reads and writes go
/// through an async `RwLock`; ingestion of one document and queries against
/// the whole corpus may interleave freely.
pub struct InMemoryStore {
    chunks: RwLock<HashMap<String, StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn store_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<StoreReceipt, StoreError> {
        let (valid, rejected) = partition_consistent(chunks);

        let mut map = self.chunks.write().await;
        let stored = valid.len() as u64;
        let now = Utc::now();
        for chunk in valid {
            map.insert(
                chunk.id.clone(),
                StoredChunk {
                    chunk,
                    updated_at: now,
                },
            );
        }

        Ok(StoreReceipt {
            stored,
            failed: rejected,
        })
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let map = self.chunks.read().await;

        let mut results: Vec<ScoredChunk> = map
            .values()
            .filter_map(|stored| {
                let embedding = stored.chunk.embedding.as_deref()?;
                if embedding.is_empty() {
                    return None;
                }
                let similarity = cosine_similarity(query_embedding, embedding);
                (similarity >= threshold).then(|| ScoredChunk {
                    chunk: stored.chunk.clone(),
                    similarity,
                })
            })
            .collect();

        sort_ranked(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn get_document_chunks(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, StoreError> {
        let map = self.chunks.read().await;
        let mut chunks: Vec<DocumentChunk> = map
            .values()
            .filter(|stored| stored.chunk.document_id == document_id)
            .map(|stored| stored.chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_document_chunks(&self, document_id: &str) -> Result<u64, StoreError> {
        let mut map = self.chunks.write().await;
        let before = map.len();
        map.retain(|_, stored| stored.chunk.document_id != document_id);
        Ok((before - map.len()) as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.chunks.write().await.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let map = self.chunks.read().await;
        let documents: HashSet<&str> = map
            .values()
            .map(|stored| stored.chunk.document_id.as_str())
            .collect();
        Ok(StoreStats {
            total_chunks: map.len() as u64,
            total_documents: documents.len() as u64,
            storage_type: StorageType::InMemory,
        })
    }

    fn storage_type(&self) -> StorageType {
        StorageType::InMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(doc: &str, index: u32, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk::new(doc, format!("{} chunk {}", doc, index), index, None)
            .with_embedding(embedding)
    }

    #[tokio::test]
    async fn test_store_then_get_ordered_by_index() {
        let store = InMemoryStore::new();
        let receipt = store
            .store_chunks(vec![
                embedded("lease", 2, vec![0.1, 0.2]),
                embedded("lease", 0, vec![0.3, 0.4]),
                embedded("lease", 1, vec![0.5, 0.6]),
            ])
            .await
            .unwrap();
        assert_eq!(receipt.stored, 3);
        assert_eq!(receipt.failed, 0);

        let chunks = store.get_document_chunks("lease").await.unwrap();
        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![embedded("lease", 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let mut updated = embedded("lease", 0, vec![0.0, 1.0]);
        updated.content = "revised clause".to_string();
        store.store_chunks(vec![updated]).await.unwrap();

        let chunks = store.get_document_chunks("lease").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "revised clause");
        assert_eq!(chunks[0].embedding.as_deref(), Some(&[0.0, 1.0][..]));
    }

    #[tokio::test]
    async fn test_threshold_excludes_dissimilar_chunk() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![
                embedded("doc-a", 0, vec![1.0, 0.0]),
                embedded("doc-b", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search_similar(&[1.0, 0.0], 2, 0.5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, "doc-a");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![embedded("doc", 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.search_similar(&[1.0, 0.0], 5, 1.0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_skips_chunks_without_embedding() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![
                DocumentChunk::new("doc", "never embedded", 0, None),
                embedded("doc", 1, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search_similar(&[1.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_index, 1);
    }

    #[tokio::test]
    async fn test_top_k_truncation_and_ordering() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![
                embedded("doc", 0, vec![1.0, 0.0]),
                embedded("doc", 1, vec![0.9, 0.1]),
                embedded("doc", 2, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let results = store.search_similar(&[1.0, 0.0], 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].similarity >= results[1].similarity);
        assert_eq!(results[0].chunk.chunk_index, 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![
                embedded("lease", 0, vec![1.0]),
                embedded("lease", 1, vec![1.0]),
                embedded("brief", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_document_chunks("lease").await.unwrap(), 2);
        assert_eq!(store.delete_document_chunks("lease").await.unwrap(), 0);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.total_documents, 1);
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let store = InMemoryStore::new();
        store
            .store_chunks(vec![
                embedded("a", 0, vec![1.0]),
                embedded("a", 1, vec![1.0]),
                embedded("b", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.storage_type, StorageType::InMemory);
        assert_eq!(stats.storage_type.to_string(), "in-memory");

        store.clear().await.unwrap();
        assert_eq!(store.stats().await.unwrap().total_chunks, 0);
    }

    #[tokio::test]
    async fn test_mutated_ordinal_counts_as_failed() {
        let store = InMemoryStore::new();
        let mut bad = embedded("doc", 0, vec![1.0]);
        bad.chunk_index = 3;

        let receipt = store
            .store_chunks(vec![bad, embedded("doc", 1, vec![1.0])])
            .await
            .unwrap();
        assert_eq!(receipt.stored, 1);
        assert_eq!(receipt.failed, 1);
        assert_eq!(store.get_document_chunks("doc").await.unwrap().len(), 1);
    }
}
