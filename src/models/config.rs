use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "lexrag_chunks";
pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Environment variable consulted when the config file carries no API key.
pub const EMBEDDING_API_KEY_VAR: &str = "EMBEDDING_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("lexrag").join("config.toml"))
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Self::default()
        };

        if config.embedding.api_key.is_none()
            && let Ok(key) = std::env::var(EMBEDDING_API_KEY_VAR)
            && !key.is_empty()
        {
            config.embedding.api_key = Some(key);
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider_url")]
    pub url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Provider credentials. Never serialized back out.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Cap on simultaneous provider calls during batch embedding.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    1536
}

fn default_timeout() -> u64 {
    30
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    2
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            model: default_model(),
            api_key: None,
            dimension: default_dimension(),
            timeout_secs: default_timeout(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive windows, in characters. Must stay below
    /// `chunk_size`.
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Inclusive lower bound on cosine similarity.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Upper bound on the built context string, in characters.
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_max_context_length() -> usize {
    8000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            max_context_length: default_max_context_length(),
        }
    }
}
