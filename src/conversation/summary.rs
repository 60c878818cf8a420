//! # Summary Projector
//!
//! Renders a conversation's turn log as a single human-readable line. Pure
//! function of a snapshot: no side effects, and unchanged state always renders
//! to the identical string.

use crate::conversation::store::{ConversationStore, StoreError};
use crate::conversation::turn::Turn;

/// Delimiter between rendered turns.
const SUMMARY_DELIMITER: &str = " | ";

/// Render the turns of `id` as `ROLE: content` entries in sequence order,
/// joined by `" | "`.
///
/// An existing conversation with no turns renders as the empty string. An
/// unknown id signals `NotFound` (summaries never auto-create).
pub fn summarize(store: &ConversationStore, id: &str) -> Result<String, StoreError> {
    let turns = store.snapshot(id)?;
    Ok(render(&turns))
}

/// Format one snapshot; shared by `summarize` and any caller that already
/// holds turns.
pub fn render(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join(SUMMARY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::turn::Role;

    #[test]
    fn test_summarize_renders_roles_uppercase_with_delimiter() {
        let store = ConversationStore::new();
        store.append("c1", Role::User, "hello".to_string());
        store.append("c1", Role::Assistant, "hi there".to_string());

        let summary = summarize(&store, "c1").unwrap();
        assert_eq!(summary, "USER: hello | ASSISTANT: hi there");
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let store = ConversationStore::new();
        store.append("c1", Role::User, "hello".to_string());
        store.append("c1", Role::Assistant, "hi there".to_string());

        let first = summarize(&store, "c1").unwrap();
        let second = summarize(&store, "c1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_summarize_unknown_id_is_not_found() {
        let store = ConversationStore::new();
        assert!(matches!(
            summarize(&store, "unknown"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_summarize_empty_conversation_is_empty_string() {
        let store = ConversationStore::new();
        store.ensure("c1");
        assert_eq!(summarize(&store, "c1").unwrap(), "");
    }

    #[test]
    fn test_render_follows_sequence_order() {
        let store = ConversationStore::new();
        store.append("c1", Role::User, "first".to_string());
        store.append("c1", Role::Assistant, "second".to_string());
        store.append("c1", Role::User, "third".to_string());

        let summary = summarize(&store, "c1").unwrap();
        assert_eq!(summary, "USER: first | ASSISTANT: second | USER: third");
    }
}
