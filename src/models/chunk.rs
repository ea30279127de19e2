use serde::{Deserialize, Serialize};

/// A contiguous slice of a source document with an optional embedding.
///
/// The embedding is absent until it has been successfully computed; a chunk
/// may legitimately persist without one after a partial embedding failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub chunk_index: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: Option<String>,
    pub source: Option<String>,
    pub page_number: Option<u32>,
    pub created_at: Option<String>,
}

impl DocumentChunk {
    /// Derive the stable chunk id from its owning document and ordinal.
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn new(
        document_id: impl Into<String>,
        content: impl Into<String>,
        chunk_index: u32,
        metadata: Option<ChunkMetadata>,
    ) -> Self {
        let document_id = document_id.into();
        let id = Self::generate_id(&document_id, chunk_index);
        Self {
            id,
            document_id,
            content: content.into(),
            chunk_index,
            embedding: None,
            metadata,
        }
    }

    /// Attach a computed embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The chunk id must always re-derive from `(document_id, chunk_index)`.
    /// A chunk violating this carries a mutated ordinal and is rejected by
    /// the stores rather than upserted.
    pub fn id_is_consistent(&self) -> bool {
        self.id == Self::generate_id(&self.document_id, self.chunk_index)
    }

    /// Attribution label for context building: the metadata source when
    /// present, otherwise the owning document id.
    pub fn source_label(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.source.as_deref())
            .unwrap_or(&self.document_id)
    }
}

/// A chunk paired with its similarity to a query embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_deterministic() {
        let id = DocumentChunk::generate_id("case-123", 5);
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
        assert_eq!(id, DocumentChunk::generate_id("case-123", 5));
        assert_ne!(id, DocumentChunk::generate_id("case-123", 6));
        assert_ne!(id, DocumentChunk::generate_id("case-124", 5));
    }

    #[test]
    fn test_new_chunk_has_no_embedding() {
        let chunk = DocumentChunk::new("case-123", "some clause", 0, None);
        assert!(chunk.embedding.is_none());
        assert!(chunk.id_is_consistent());
    }

    #[test]
    fn test_id_consistency_detects_mutated_index() {
        let mut chunk = DocumentChunk::new("case-123", "some clause", 0, None);
        chunk.chunk_index = 7;
        assert!(!chunk.id_is_consistent());
    }

    #[test]
    fn test_json_omits_absent_embedding() {
        let chunk = DocumentChunk::new("case-123", "some clause", 0, None);
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());
        assert!(json.get("metadata").is_none());

        let embedded = chunk.with_embedding(vec![0.5, 0.5]);
        let json = serde_json::to_value(&embedded).unwrap();
        assert_eq!(json["embedding"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_source_label_falls_back_to_document_id() {
        let chunk = DocumentChunk::new("case-123", "text", 0, None);
        assert_eq!(chunk.source_label(), "case-123");

        let with_source = DocumentChunk::new(
            "case-123",
            "text",
            0,
            Some(ChunkMetadata {
                source: Some("lease-agreement.pdf".to_string()),
                ..Default::default()
            }),
        );
        assert_eq!(with_source.source_label(), "lease-agreement.pdf");
    }
}
