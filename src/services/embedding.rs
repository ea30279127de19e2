//! Client for the external embedding provider.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::EmbeddingError;
use crate::models::{ChunkMetadata, DocumentChunk, EmbeddingConfig};
use crate::utils::retry::{RetryConfig, with_retry};

/// Request body for the provider's `/embeddings` endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from the provider: `{ "data": [ { "embedding": [..] } ] }`.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Client for the embedding provider.
///
/// One instance is shared across ingestion and querying; batch embedding runs
/// per-chunk calls under a bounded concurrency cap so a single slow or failed
/// chunk never stalls or aborts the rest of the batch.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dimension: u32,
    max_concurrency: usize,
    retry: RetryConfig,
}

impl EmbeddingClient {
    /// Create a client. Fails when no credentials are configured; the
    /// provider would reject every call anyway.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                EmbeddingError::ProviderUnavailable("missing API key".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| {
                EmbeddingError::ProviderUnavailable("invalid API key characters".to_string())
            })?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            max_concurrency: config.max_concurrency.max(1),
            retry: RetryConfig::new(config.max_retries + 1),
        })
    }

    /// Embed one text blob. Transient provider failures are retried with
    /// backoff; permanent ones surface immediately.
    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        with_retry(&self.retry, || self.request_embedding(text)).await
    }

    /// Embed a batch of chunk texts for one document, independently per
    /// chunk. A chunk whose embedding fails is logged and omitted; the
    /// returned list may therefore be shorter than the input, which the
    /// caller can detect to schedule a re-ingest.
    pub async fn embed_chunks(
        &self,
        document_id: &str,
        chunks: Vec<String>,
        metadata: Option<ChunkMetadata>,
    ) -> Vec<DocumentChunk> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, content) in chunks.into_iter().enumerate() {
            let client = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let document_id = document_id.to_string();
            let metadata = metadata.clone();

            tasks.spawn(async move {
                // Closed only when the JoinSet is dropped mid-flight
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };

                match client.generate_embedding(&content).await {
                    Ok(embedding) => Some(
                        DocumentChunk::new(document_id, content, index as u32, metadata)
                            .with_embedding(embedding),
                    ),
                    Err(error) => {
                        tracing::warn!(
                            document_id = %document_id,
                            chunk_index = index,
                            %error,
                            "skipping chunk after embedding failure"
                        );
                        None
                    }
                }
            });
        }

        let mut embedded: Vec<DocumentChunk> = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Some(chunk)) => embedded.push(chunk),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(document_id, %error, "embedding task cancelled");
                }
            }
        }

        embedded.sort_by_key(|c| c.chunk_index);
        embedded
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EmbeddingError::ProviderUnavailable(format!(
                "credentials rejected (status {})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ProviderUnavailable(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let embedding = embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty data array".to_string()))?;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty vector".to_string()));
        }
        if embedding.len() != self.dimension as usize {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }
}
