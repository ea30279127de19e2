mod chunk;
mod config;
mod context;

pub use chunk::{ChunkMetadata, DocumentChunk, ScoredChunk};
pub use config::{
    ChunkingConfig, Config, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_PROVIDER_URL, DEFAULT_QDRANT_URL, EmbeddingConfig,
    RetrievalConfig, StoreConfig,
};
pub use context::{ChatMessage, IngestReport, QueryResponse, RagContext, Role};
