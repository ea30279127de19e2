//! Document retrieval core for a legal-assistant product.
//!
//! Splits raw document text into overlapping windows, embeds them through an
//! external provider, persists them in a durable vector store with a
//! transparent in-memory fallback, and answers similarity queries as
//! length-bounded, source-attributed context blocks for downstream text
//! generation.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{ConfigError, EmbeddingError, LexragError, StoreError};
pub use models::{
    ChatMessage, ChunkMetadata, Config, DocumentChunk, IngestReport, QueryResponse, RagContext,
    RetrievalConfig, Role, ScoredChunk,
};
pub use services::{
    ChunkStore, EmbeddingClient, FallbackStore, InMemoryStore, QdrantStore, RetrievalPipeline,
    RetrievalService, StorageType, StoreReceipt, StoreStats, chunk_document, inject_context,
};
