//! Pure merge of a built context into a conversation history.

use crate::models::{ChatMessage, RagContext, Role};

/// Return a new message list with the last user message's content prefixed
/// by the retrieved context. The input is never mutated. A context with no
/// retrieved chunks, or a history without a user message, passes through
/// with identical content.
pub fn inject_context(messages: &[ChatMessage], rag_context: &RagContext) -> Vec<ChatMessage> {
    let mut merged: Vec<ChatMessage> = messages.to_vec();

    if rag_context.is_empty() || rag_context.context.is_empty() {
        return merged;
    }

    let Some(last_user) = merged.iter().rposition(|m| m.role == Role::User) else {
        return merged;
    };

    let prefixed = format!(
        "Relevant excerpts from the matter's documents:\n\n{}\n\n---\n\n{}",
        rag_context.context, merged[last_user].content
    );
    merged[last_user].content = prefixed;

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentChunk, ScoredChunk};

    fn context_with_chunk() -> RagContext {
        RagContext {
            query: "q".to_string(),
            retrieved_chunks: vec![ScoredChunk {
                chunk: DocumentChunk::new("lease", "no subletting without consent", 0, None),
                similarity: 0.92,
            }],
            context: "[Document 1]\nno subletting without consent".to_string(),
            sources: vec!["lease".to_string()],
        }
    }

    #[test]
    fn test_empty_context_is_a_no_op() {
        let messages = vec![
            ChatMessage::system("You are a legal assistant."),
            ChatMessage::user("Can my client sublet?"),
        ];
        let merged = inject_context(&messages, &RagContext::empty("q"));
        assert_eq!(merged, messages);
    }

    #[test]
    fn test_last_user_message_is_prefixed() {
        let messages = vec![
            ChatMessage::system("You are a legal assistant."),
            ChatMessage::user("Earlier question"),
            ChatMessage::assistant("Earlier answer"),
            ChatMessage::user("Can my client sublet?"),
        ];
        let merged = inject_context(&messages, &context_with_chunk());

        // Everything before the last user message is untouched
        assert_eq!(merged[0], messages[0]);
        assert_eq!(merged[1], messages[1]);
        assert_eq!(merged[2], messages[2]);

        assert!(merged[3].content.contains("no subletting without consent"));
        assert!(merged[3].content.ends_with("Can my client sublet?"));
    }

    #[test]
    fn test_input_list_is_not_mutated() {
        let messages = vec![ChatMessage::user("Can my client sublet?")];
        let _ = inject_context(&messages, &context_with_chunk());
        assert_eq!(messages[0].content, "Can my client sublet?");
    }

    #[test]
    fn test_history_without_user_message_passes_through() {
        let messages = vec![ChatMessage::system("You are a legal assistant.")];
        let merged = inject_context(&messages, &context_with_chunk());
        assert_eq!(merged, messages);
    }

    #[test]
    fn test_trailing_assistant_message_does_not_receive_context() {
        let messages = vec![
            ChatMessage::user("Can my client sublet?"),
            ChatMessage::assistant("Let me check."),
        ];
        let merged = inject_context(&messages, &context_with_chunk());
        assert!(merged[0].content.contains("no subletting without consent"));
        assert_eq!(merged[1], messages[1]);
    }
}
