//! Error types for the retrieval core.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("cannot embed empty input")]
    EmptyInput,

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::Timeout => true,
            EmbeddingError::ProviderUnavailable(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("connect")
            }
            // Request errors depend on the underlying cause
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            // Bad input and malformed responses are not retryable
            EmbeddingError::EmptyInput | EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to chunk store operations.
///
/// `Unavailable` marks the primary backend as unreachable. The fallback
/// decorator treats every primary-side error as a trigger to switch to the
/// in-memory store for the remainder of that call; an error raised by the
/// in-memory store itself is fatal for that operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::CollectionError(msg)
            | StoreError::UpsertError(msg)
            | StoreError::SearchError(msg)
            | StoreError::DeleteError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("invalid chunking configuration: {0}")]
    InvalidChunking(String),
}

/// Top-level errors surfaced by the pipeline facade.
#[derive(Debug, Error)]
pub enum LexragError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
