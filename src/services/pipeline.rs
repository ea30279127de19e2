//! The surface consumed by upload and chat endpoints: ingest, query,
//! delete, stats.

use std::sync::Arc;

use crate::error::LexragError;
use crate::models::{
    ChunkMetadata, ChunkingConfig, Config, IngestReport, QueryResponse, RagContext,
    RetrievalConfig,
};
use crate::services::chunker::chunk_with_config;
use crate::services::embedding::EmbeddingClient;
use crate::services::retrieval::RetrievalService;
use crate::services::store::{ChunkStore, FallbackStore, InMemoryStore, QdrantStore, StoreStats};

/// Ingestion and retrieval over one corpus.
///
/// The store handle is injected at construction; [`RetrievalPipeline::from_config`]
/// wires the default stack (Qdrant primary with an in-memory fallback).
pub struct RetrievalPipeline {
    embedder: EmbeddingClient,
    retrieval: RetrievalService,
    store: Arc<dyn ChunkStore>,
    chunking: ChunkingConfig,
    retrieval_config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: EmbeddingClient,
        store: Arc<dyn ChunkStore>,
        chunking: ChunkingConfig,
        retrieval_config: RetrievalConfig,
    ) -> Self {
        let retrieval = RetrievalService::new(embedder.clone(), Arc::clone(&store));
        Self {
            embedder,
            retrieval,
            store,
            chunking,
            retrieval_config,
        }
    }

    /// Build the default stack from configuration: embedding client plus a
    /// Qdrant primary decorated with an in-memory fallback.
    pub fn from_config(config: &Config) -> Result<Self, LexragError> {
        let embedder = EmbeddingClient::new(&config.embedding)?;
        let primary = QdrantStore::new(&config.store, u64::from(config.embedding.dimension))?;
        let store: Arc<dyn ChunkStore> =
            Arc::new(FallbackStore::new(Box::new(primary), InMemoryStore::new()));
        Ok(Self::new(
            embedder,
            store,
            config.chunking.clone(),
            config.retrieval.clone(),
        ))
    }

    /// Chunk, embed, and persist one document. Re-ingesting the same
    /// `document_id` upserts its chunks in place.
    ///
    /// `embedded_count` below `chunk_count` means some chunks were skipped
    /// after embedding failures; the document can be re-ingested later to
    /// fill the gap.
    pub async fn ingest(
        &self,
        document_id: &str,
        raw_text: &str,
        metadata: Option<ChunkMetadata>,
    ) -> Result<IngestReport, LexragError> {
        let windows = chunk_with_config(raw_text, &self.chunking)?;
        let chunk_count = windows.len() as u64;

        if windows.is_empty() {
            tracing::debug!(document_id, "nothing to ingest");
            return Ok(IngestReport {
                chunk_count: 0,
                embedded_count: 0,
            });
        }

        let embedded = self
            .embedder
            .embed_chunks(document_id, windows, metadata)
            .await;
        let embedded_count = embedded.len() as u64;

        if embedded_count < chunk_count {
            tracing::warn!(
                document_id,
                chunk_count,
                embedded_count,
                "partial embedding failure during ingestion"
            );
        }

        if !embedded.is_empty() {
            let receipt = self.store.store_chunks(embedded).await?;
            tracing::debug!(
                document_id,
                stored = receipt.stored,
                failed = receipt.failed,
                "persisted document chunks"
            );
        }

        Ok(IngestReport {
            chunk_count,
            embedded_count,
        })
    }

    /// Retrieve ranked context for a query. Never fails: a query that cannot
    /// be embedded or searched yields an empty response.
    pub async fn query(&self, query: &str) -> QueryResponse {
        let ctx = self.query_context(query).await;
        QueryResponse {
            context: ctx.context,
            sources: ctx.sources,
            chunks: ctx.retrieved_chunks.into_iter().map(|s| s.chunk).collect(),
        }
    }

    /// Like [`RetrievalPipeline::query`], keeping the full [`RagContext`]
    /// for conversation injection.
    pub async fn query_context(&self, query: &str) -> RagContext {
        self.retrieval
            .retrieve_context(query, &self.retrieval_config)
            .await
    }

    /// Remove every chunk of one document. Idempotent.
    pub async fn delete(&self, document_id: &str) -> Result<u64, LexragError> {
        Ok(self.store.delete_document_chunks(document_id).await?)
    }

    /// Drop the whole corpus.
    pub async fn clear(&self) -> Result<(), LexragError> {
        Ok(self.store.clear().await?)
    }

    pub async fn stats(&self) -> Result<StoreStats, LexragError> {
        Ok(self.store.stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmbeddingConfig;
    use crate::services::store::StorageType;

    fn offline_pipeline() -> RetrievalPipeline {
        let config = EmbeddingConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: Some("test-key".to_string()),
            max_retries: 0,
            timeout_secs: 2,
            ..Default::default()
        };
        let embedder = EmbeddingClient::new(&config).unwrap();
        let store: Arc<dyn ChunkStore> =
            Arc::new(FallbackStore::memory_only(InMemoryStore::new()));
        RetrievalPipeline::new(
            embedder,
            store,
            ChunkingConfig::default(),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_ingest_counts_windows_even_when_embedding_fails() {
        let pipeline = offline_pipeline();
        let text = "z".repeat(5000);
        let report = pipeline.ingest("case-1", &text, None).await.unwrap();
        // 2000/200 windows: [0,2000), [1800,3800), [3600,5000)
        assert_eq!(report.chunk_count, 3);
        assert_eq!(report.embedded_count, 0);
    }

    #[tokio::test]
    async fn test_ingest_empty_document() {
        let pipeline = offline_pipeline();
        let report = pipeline.ingest("case-1", "   ", None).await.unwrap();
        assert_eq!(report.chunk_count, 0);
        assert_eq!(report.embedded_count, 0);
        assert_eq!(pipeline.stats().await.unwrap().total_chunks, 0);
    }

    #[tokio::test]
    async fn test_query_with_unreachable_provider_is_empty_not_error() {
        let pipeline = offline_pipeline();
        let response = pipeline.query("force majeure clauses").await;
        assert!(response.context.is_empty());
        assert!(response.sources.is_empty());
        assert!(response.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_through_the_facade() {
        let pipeline = offline_pipeline();
        assert_eq!(pipeline.delete("missing-doc").await.unwrap(), 0);
        assert_eq!(pipeline.delete("missing-doc").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_reports_memory_backend() {
        let pipeline = offline_pipeline();
        let stats = pipeline.stats().await.unwrap();
        assert_eq!(stats.storage_type, StorageType::InMemory);
        assert_eq!(stats.total_documents, 0);
    }
}
