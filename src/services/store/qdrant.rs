//! Durable chunk storage on Qdrant.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    PayloadIncludeSelector, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
};

use super::{ChunkStore, StorageType, StoreReceipt, StoreStats, partition_consistent, sort_ranked};
use crate::error::StoreError;
use crate::models::{ChunkMetadata, DocumentChunk, ScoredChunk, StoreConfig};

/// Primary chunk store backed by Qdrant's native cosine-distance search.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantStore {
    pub fn new(config: &StoreConfig, embedding_dim: u64) -> Result<Self, StoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    pub async fn collection_exists(&self) -> Result<bool, StoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(false)
                } else {
                    Err(StoreError::Unavailable(msg))
                }
            }
        }
    }

    /// Create the backing collection when absent.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| StoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn document_filter(document_id: &str) -> Filter {
        Filter::must([Condition::matches("document_id", document_id.to_string())])
    }

    fn chunk_to_point(chunk: DocumentChunk, embedding: Vec<f32>) -> PointStruct {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("document_id".to_string(), chunk.document_id.into());
        payload.insert(
            "chunk_index".to_string(),
            i64::from(chunk.chunk_index).into(),
        );
        payload.insert("content".to_string(), chunk.content.into());
        payload.insert(
            "updated_at".to_string(),
            chrono::Utc::now().to_rfc3339().into(),
        );

        if let Some(metadata) = chunk.metadata {
            if let Some(title) = metadata.title {
                payload.insert("title".to_string(), title.into());
            }
            if let Some(source) = metadata.source {
                payload.insert("source".to_string(), source.into());
            }
            if let Some(page) = metadata.page_number {
                payload.insert("page_number".to_string(), i64::from(page).into());
            }
            if let Some(created_at) = metadata.created_at {
                payload.insert("created_at".to_string(), created_at.into());
            }
        }

        PointStruct::new(chunk.id, embedding, payload)
    }

    fn payload_str(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
        key: &str,
    ) -> Option<String> {
        payload.get(key).and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn payload_int(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
        key: &str,
    ) -> Option<i64> {
        payload.get(key).and_then(|v| match &v.kind {
            Some(Kind::IntegerValue(n)) => Some(*n),
            _ => None,
        })
    }

    fn chunk_from_payload(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
    ) -> DocumentChunk {
        let document_id = Self::payload_str(payload, "document_id").unwrap_or_default();
        let chunk_index = Self::payload_int(payload, "chunk_index").unwrap_or(0) as u32;
        let content = Self::payload_str(payload, "content").unwrap_or_default();

        let metadata = {
            let title = Self::payload_str(payload, "title");
            let source = Self::payload_str(payload, "source");
            let page_number = Self::payload_int(payload, "page_number").map(|n| n as u32);
            let created_at = Self::payload_str(payload, "created_at");
            if title.is_some() || source.is_some() || page_number.is_some() || created_at.is_some()
            {
                Some(ChunkMetadata {
                    title,
                    source,
                    page_number,
                    created_at,
                })
            } else {
                None
            }
        };

        DocumentChunk {
            id: DocumentChunk::generate_id(&document_id, chunk_index),
            document_id,
            content,
            chunk_index,
            embedding: None,
            metadata,
        }
    }

    /// Page through all points of one document.
    async fn scroll_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>, StoreError> {
        let mut chunks = Vec::new();
        let mut offset: Option<qdrant_client::qdrant::PointId> = None;

        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .filter(Self::document_filter(document_id))
                .limit(256)
                .with_payload(true)
                .with_vectors(false);

            if let Some(off) = offset {
                scroll_builder = scroll_builder.offset(off);
            }

            let response = self
                .client
                .scroll(scroll_builder)
                .await
                .map_err(|e| StoreError::SearchError(e.to_string()))?;

            if response.result.is_empty() {
                break;
            }

            chunks.extend(
                response
                    .result
                    .iter()
                    .map(|point| Self::chunk_from_payload(&point.payload)),
            );

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(chunks)
    }

    async fn count_document_chunks(&self, document_id: &str) -> Result<u64, StoreError> {
        let count = CountPointsBuilder::new(&self.collection)
            .filter(Self::document_filter(document_id))
            .exact(true);

        let response = self
            .client
            .count(count)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        Ok(response.result.map_or(0, |r| r.count))
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn store_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<StoreReceipt, StoreError> {
        let (valid, mut failed) = partition_consistent(chunks);

        let mut points = Vec::with_capacity(valid.len());
        for chunk in valid {
            // Qdrant points need a vector; an unembedded chunk cannot land here
            match chunk.embedding.clone() {
                Some(embedding) if !embedding.is_empty() => {
                    points.push(Self::chunk_to_point(chunk, embedding));
                }
                _ => {
                    tracing::warn!(
                        chunk_id = %chunk.id,
                        "cannot upsert chunk without embedding to qdrant"
                    );
                    failed += 1;
                }
            }
        }

        let stored = points.len() as u64;
        if stored > 0 {
            self.ensure_collection().await?;
            let upsert = UpsertPointsBuilder::new(&self.collection, points);
            self.client
                .upsert_points(upsert)
                .await
                .map_err(|e| StoreError::UpsertError(e.to_string()))?;
        }

        Ok(StoreReceipt { stored, failed })
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let search = SearchPointsBuilder::new(
            &self.collection,
            query_embedding.to_vec(),
            top_k as u64,
        )
        .with_payload(true)
        .score_threshold(threshold);

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| StoreError::SearchError(e.to_string()))?;

        let mut results: Vec<ScoredChunk> = response
            .result
            .into_iter()
            .map(|point| ScoredChunk {
                chunk: Self::chunk_from_payload(&point.payload),
                similarity: point.score,
            })
            .collect();

        // Qdrant orders by score; re-sorting pins down tie order as well
        sort_ranked(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn get_document_chunks(
        &self,
        document_id: &str,
    ) -> Result<Vec<DocumentChunk>, StoreError> {
        let mut chunks = self.scroll_document(document_id).await?;
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn delete_document_chunks(&self, document_id: &str) -> Result<u64, StoreError> {
        let count = self.count_document_chunks(document_id).await?;
        if count == 0 {
            return Ok(0);
        }

        let delete =
            DeletePointsBuilder::new(&self.collection).points(Self::document_filter(document_id));

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| StoreError::DeleteError(e.to_string()))?;

        Ok(count)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        if !self.collection_exists().await? {
            return Ok(());
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| StoreError::DeleteError(e.to_string()))?;

        self.ensure_collection().await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let total_chunks = info.result.map_or(0, |r| r.points_count.unwrap_or(0));

        // Qdrant has no distinct-count operator; walk document_id payloads
        let mut documents: HashSet<String> = HashSet::new();
        let mut offset: Option<qdrant_client::qdrant::PointId> = None;
        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .limit(512)
                .with_payload(PayloadIncludeSelector {
                    fields: vec!["document_id".to_string()],
                })
                .with_vectors(false);

            if let Some(off) = offset {
                scroll_builder = scroll_builder.offset(off);
            }

            let response = self
                .client
                .scroll(scroll_builder)
                .await
                .map_err(|e| StoreError::SearchError(e.to_string()))?;

            if response.result.is_empty() {
                break;
            }

            for point in &response.result {
                if let Some(id) = Self::payload_str(&point.payload, "document_id") {
                    documents.insert(id);
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(StoreStats {
            total_chunks,
            total_documents: documents.len() as u64,
            storage_type: StorageType::Qdrant,
        })
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Qdrant
    }
}
