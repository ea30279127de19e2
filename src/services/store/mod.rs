//! Chunk persistence behind one contract.
//!
//! Two interchangeable backends implement [`ChunkStore`]: the durable
//! [`QdrantStore`] with native cosine search, and the process-local
//! [`InMemoryStore`]. [`FallbackStore`] decorates them with the
//! try-primary-then-fallback discipline used when the durable backend is
//! unreachable.

mod fallback;
mod memory;
mod qdrant;

pub use fallback::FallbackStore;
pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{DocumentChunk, ScoredChunk};

/// Which backend served an operation. Observable through [`StoreStats`] as
/// the signal of degraded mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageType {
    Qdrant,
    InMemory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Qdrant => write!(f, "qdrant"),
            StorageType::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Outcome of a batch upsert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub stored: u64,
    pub failed: u64,
}

/// Corpus counters for one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: u64,
    pub total_documents: u64,
    pub storage_type: StorageType,
}

/// Persistence contract shared by all backends.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Upsert chunks by id, overwriting content, embedding, metadata, and the
    /// modification timestamp. Chunks whose id does not re-derive from their
    /// own `(document_id, chunk_index)` are rejected and counted as failed;
    /// the ordinal is immutable once assigned.
    async fn store_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<StoreReceipt, StoreError>;

    /// Rank every embedded chunk by cosine similarity against the query
    /// vector, keep those at or above `threshold`, and return the best
    /// `top_k` in deterministic order.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// All chunks of one document, ascending by `chunk_index`.
    async fn get_document_chunks(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, StoreError>;

    /// Remove all chunks of one document. Idempotent; deleting an absent
    /// document returns 0.
    async fn delete_document_chunks(&self, document_id: &str) -> Result<u64, StoreError>;

    /// Drop the whole corpus.
    async fn clear(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    fn storage_type(&self) -> StorageType;
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// A zero-norm vector (or a length mismatch) yields 0.0 rather than NaN, so
/// degenerate embeddings rank last instead of poisoning the sort.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Descending similarity; ties break ascending by `chunk_index`, then by
/// `document_id`, so result order is stable and testable across backends.
pub(crate) fn sort_ranked(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
    });
}

/// Split a batch into upsertable chunks and ones carrying a mutated ordinal.
pub(crate) fn partition_consistent(
    chunks: Vec<DocumentChunk>,
) -> (Vec<DocumentChunk>, u64) {
    let mut rejected = 0u64;
    let valid = chunks
        .into_iter()
        .filter(|chunk| {
            if chunk.id_is_consistent() {
                true
            } else {
                tracing::warn!(
                    chunk_id = %chunk.id,
                    document_id = %chunk.document_id,
                    chunk_index = chunk.chunk_index,
                    "rejecting chunk whose id does not match its ordinal"
                );
                rejected += 1;
                false
            }
        })
        .collect();
    (valid, rejected)
}
