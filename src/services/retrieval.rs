//! Query-time orchestration: embed the query, search the store, and shape
//! the survivors into a bounded context block.

use std::sync::Arc;

use crate::models::{RagContext, RetrievalConfig, ScoredChunk};
use crate::services::embedding::EmbeddingClient;
use crate::services::store::ChunkStore;

/// Delimiter between context blocks.
const BLOCK_DELIMITER: &str = "\n\n---\n\n";

/// Retrieval orchestrator. The store handle is injected at construction so
/// callers (and tests) decide which backend stack sits behind it.
pub struct RetrievalService {
    embedder: EmbeddingClient,
    store: Arc<dyn ChunkStore>,
}

impl RetrievalService {
    pub fn new(embedder: EmbeddingClient, store: Arc<dyn ChunkStore>) -> Self {
        Self { embedder, store }
    }

    /// Rank the corpus against a query.
    ///
    /// Failures at either suspension point terminate only this query: a
    /// query that cannot be embedded, or a search the store cannot serve,
    /// yields an empty list with a warning rather than an error. Downstream
    /// generation proceeds ungrounded.
    pub async fn retrieve_documents(
        &self,
        query: &str,
        config: &RetrievalConfig,
    ) -> Vec<ScoredChunk> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        tracing::debug!(query, "embedding query");
        let query_embedding = match self.embedder.generate_embedding(query).await {
            Ok(embedding) => embedding,
            Err(error) => {
                tracing::warn!(%error, "query embedding failed, returning empty context");
                return Vec::new();
            }
        };

        tracing::debug!(top_k = config.top_k, "searching chunk store");
        match self
            .store
            .search_similar(&query_embedding, config.top_k, config.min_similarity)
            .await
        {
            Ok(results) => {
                tracing::debug!(count = results.len(), "ranked retrieval results");
                results
            }
            Err(error) => {
                tracing::warn!(%error, "similarity search failed, returning empty context");
                Vec::new()
            }
        }
    }

    /// Assemble ranked chunks into a labeled, length-bounded context.
    ///
    /// Blocks are `"[Document N]\n<content>"` joined by a delimiter.
    /// Truncation drops whole trailing chunks, so the emitted context never
    /// ends inside a partially included block. `sources` collects the
    /// distinct attribution labels of the chunks that made it in, in
    /// first-seen order.
    pub fn build_context(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        max_context_length: usize,
    ) -> RagContext {
        build_context(query, chunks, max_context_length)
    }

    /// Full query pipeline: retrieve, then build.
    pub async fn retrieve_context(&self, query: &str, config: &RetrievalConfig) -> RagContext {
        let chunks = self.retrieve_documents(query, config).await;
        self.build_context(query, &chunks, config.max_context_length)
    }
}

pub(crate) fn build_context(
    query: &str,
    chunks: &[ScoredChunk],
    max_context_length: usize,
) -> RagContext {
    let mut context = String::new();
    let mut sources: Vec<String> = Vec::new();
    let mut included: Vec<ScoredChunk> = Vec::new();
    // Budget in characters, matching the chunker's character-based windows
    let mut used = 0usize;

    for (position, scored) in chunks.iter().enumerate() {
        let block = format!("[Document {}]\n{}", position + 1, scored.chunk.content);
        let block_chars = block.chars().count();
        let added = if context.is_empty() {
            block_chars
        } else {
            BLOCK_DELIMITER.len() + block_chars
        };

        if used + added > max_context_length {
            break;
        }
        used += added;

        if !context.is_empty() {
            context.push_str(BLOCK_DELIMITER);
        }
        context.push_str(&block);

        let label = scored.chunk.source_label().to_string();
        if !sources.contains(&label) {
            sources.push(label);
        }
        included.push(scored.clone());
    }

    RagContext {
        query: query.to_string(),
        retrieved_chunks: included,
        context,
        sources,
    }
}
