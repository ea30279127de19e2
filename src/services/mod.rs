pub mod chunker;
pub mod embedding;
pub mod injector;
pub mod pipeline;
pub mod retrieval;
pub mod store;

pub use chunker::chunk_document;
pub use embedding::EmbeddingClient;
pub use injector::inject_context;
pub use pipeline::RetrievalPipeline;
pub use retrieval::RetrievalService;
pub use store::{
    ChunkStore, FallbackStore, InMemoryStore, QdrantStore, StorageType, StoreReceipt, StoreStats,
};
