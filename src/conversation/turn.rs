//! # Conversation Turn Types
//!
//! Core data types for the per-conversation turn log: each turn records a
//! speaker role and content plus its position in the conversation's total order.
//!
//! ## Ordering Model:
//! Turns are ordered by their `sequence` number, assigned at append time, not by
//! arrival timestamp. Sequence numbers are monotonic and gapless per conversation,
//! which keeps replay deterministic even when appends race.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
///
/// ## Wire Format:
/// Serializes lowercase (`"user"` / `"assistant"`) to match the chat-completion
/// provider's message roles. Summary rendering uses the uppercase [`Role::label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A transcribed user utterance
    User,
    /// An assistant reply generated by the completion provider
    Assistant,
}

impl Role {
    /// Lowercase role name used on provider wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Uppercase role label used in rendered summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

/// One message in a conversation.
///
/// Immutable once created; the store hands out clones, never references into its
/// own log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced this turn
    pub role: Role,

    /// The utterance or reply text
    pub content: String,

    /// Position in the conversation's total order, starting at 1
    pub sequence: u64,

    /// When the turn was appended (informational; ordering is by `sequence`)
    pub timestamp: DateTime<Utc>,
}

/// The ordered turn history for one conversation id.
///
/// Owned exclusively by the conversation store; callers only ever see snapshot
/// copies of `turns`.
#[derive(Debug)]
pub struct Conversation {
    /// Identifier this history is keyed by
    pub id: String,

    /// Turns in sequence order
    turns: Vec<Turn>,

    /// Sequence number the next append will receive
    next_sequence: u64,
}

impl Conversation {
    /// Create an empty conversation. The first appended turn gets sequence 1.
    pub fn new(id: String) -> Self {
        Self {
            id,
            turns: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Append a turn under the next sequence number and return a copy of the
    /// stored turn.
    pub fn push(&mut self, role: Role, content: String) -> Turn {
        let turn = Turn {
            role,
            content,
            sequence: self.next_sequence,
            timestamp: Utc::now(),
        };
        self.next_sequence += 1;
        self.turns.push(turn.clone());
        turn
    }

    /// Point-in-time copy of the turn log, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Number of turns appended so far.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True if no turn has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "USER");
        assert_eq!(Role::Assistant.label(), "ASSISTANT");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn test_push_assigns_gapless_sequences() {
        let mut conversation = Conversation::new("c1".to_string());
        assert!(conversation.is_empty());

        let first = conversation.push(Role::User, "hello".to_string());
        let second = conversation.push(Role::Assistant, "hi there".to_string());
        let third = conversation.push(Role::User, "thanks".to_string());

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(third.sequence, 3);
        assert_eq!(conversation.len(), 3);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut conversation = Conversation::new("c1".to_string());
        conversation.push(Role::User, "hello".to_string());

        let snapshot = conversation.snapshot();
        conversation.push(Role::Assistant, "hi there".to_string());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(conversation.len(), 2);
        assert_eq!(snapshot[0].content, "hello");
    }
}
