//! Ephemeral retrieval artifacts: built context, conversation messages, and
//! the reports returned by the ingestion/query surface.

use serde::{Deserialize, Serialize};

use super::chunk::{DocumentChunk, ScoredChunk};

/// The outcome of one retrieval query. Created per query, handed to the
/// caller, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagContext {
    /// Original query text.
    pub query: String,

    /// Chunks that survived ranking and filtering, best first.
    pub retrieved_chunks: Vec<ScoredChunk>,

    /// Length-bounded context block ready for prompt injection.
    pub context: String,

    /// Distinct attribution labels across included chunks, first-seen order.
    pub sources: Vec<String>,
}

impl RagContext {
    /// A context carrying no retrieved material.
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            retrieved_chunks: Vec::new(),
            context: String::new(),
            sources: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retrieved_chunks.is_empty()
    }
}

/// Conversation role understood by the downstream text generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Result of ingesting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Windows produced by the chunker.
    pub chunk_count: u64,

    /// Chunks that received an embedding. A value below `chunk_count`
    /// signals a partial embedding failure the caller may retry later.
    pub embedded_count: u64,
}

/// Result of one query against the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub context: String,
    pub sources: Vec<String>,
    pub chunks: Vec<DocumentChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = RagContext::empty("what does the lease say about subletting?");
        assert!(ctx.is_empty());
        assert!(ctx.context.is_empty());
        assert!(ctx.sources.is_empty());
    }

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
    }
}
