//! # Conversation Store
//!
//! Owns every conversation's append-only turn log, keyed by conversation id.
//! This is the single writer surface for conversation state; everything else in
//! the pipeline works on snapshot copies.
//!
//! ## Locking Model:
//! A read/write-locked map from id to a per-conversation mutex. The map lock is
//! held only long enough to look up or insert the per-id handle; sequence
//! assignment happens under the inner mutex. Appends on the same id serialize,
//! appends on different ids proceed independently, and no lock is ever held
//! across an await point.
//!
//! ## Unknown-Id Policy (explicit, per operation):
//! - `ensure` / `append`: auto-create. The upload path must accept a fresh id on
//!   first contact.
//! - `snapshot`: `NotFound`. Reads of conversations that never happened are a
//!   caller error.
//! - `clear`: no-op that reports whether anything existed.

use crate::conversation::turn::{Conversation, Role, Turn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Conversation id used when a client doesn't name one.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Failure cases for store reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced conversation id does not exist
    NotFound(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "conversation '{}' not found", id),
        }
    }
}

impl std::error::Error for StoreError {}

/// In-memory store of all active conversations.
///
/// ## Thread Safety:
/// Safe to share behind an `Arc`. Multiple readers can resolve handles
/// concurrently; writers briefly take the map lock to insert or remove entries.
pub struct ConversationStore {
    /// Conversation handles by id; the inner mutex serializes appends per id
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the handle for an id, creating an empty conversation if absent.
    fn ensure_handle(&self, id: &str) -> Arc<Mutex<Conversation>> {
        // Fast path: the conversation already exists.
        {
            let map = self.conversations.read().unwrap();
            if let Some(handle) = map.get(id) {
                return Arc::clone(handle);
            }
        }

        let mut map = self.conversations.write().unwrap();
        Arc::clone(
            map.entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(id.to_string())))),
        )
    }

    /// Create an empty conversation for `id` if one does not exist. Idempotent.
    pub fn ensure(&self, id: &str) {
        self.ensure_handle(id);
    }

    /// Append a turn to `id`, assigning the next sequence number atomically with
    /// respect to other appends on the same id. Auto-creates unknown ids.
    ///
    /// ## Returns:
    /// A copy of the stored turn, including its assigned sequence number.
    pub fn append(&self, id: &str, role: Role, content: String) -> Turn {
        let handle = self.ensure_handle(id);
        let mut conversation = handle.lock().unwrap();
        conversation.push(role, content)
    }

    /// Point-in-time copy of the turn log for `id`, oldest first.
    ///
    /// The critical section is a single clone under the per-conversation lock;
    /// concurrent appends are delayed only for that copy, never indefinitely.
    pub fn snapshot(&self, id: &str) -> Result<Vec<Turn>, StoreError> {
        let handle = {
            let map = self.conversations.read().unwrap();
            map.get(id).cloned()
        };

        match handle {
            Some(handle) => {
                let conversation = handle.lock().unwrap();
                Ok(conversation.snapshot())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Remove `id` and all its turns. Returns whether a conversation existed.
    /// A subsequent `ensure` starts fresh with sequence numbers from 1.
    pub fn clear(&self, id: &str) -> bool {
        let mut map = self.conversations.write().unwrap();
        map.remove(id).is_some()
    }

    /// Number of conversations currently held.
    pub fn len(&self) -> usize {
        self.conversations.read().unwrap().len()
    }

    /// True if no conversation is currently held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total turns across all conversations, for the health/metrics surface.
    pub fn total_turns(&self) -> usize {
        let handles: Vec<Arc<Mutex<Conversation>>> = {
            let map = self.conversations.read().unwrap();
            map.values().cloned().collect()
        };

        handles
            .iter()
            .map(|handle| handle.lock().unwrap().len())
            .sum()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_ensure_is_idempotent() {
        let store = ConversationStore::new();

        store.ensure("c1");
        store.ensure("c1");
        store.ensure("c1");

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot("c1").unwrap().len(), 0);
    }

    #[test]
    fn test_append_auto_creates_and_sequences() {
        let store = ConversationStore::new();

        let first = store.append("c1", Role::User, "hello".to_string());
        let second = store.append("c1", Role::Assistant, "hi there".to_string());

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);

        let turns = store.snapshot("c1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "hi there");
    }

    #[test]
    fn test_snapshot_unknown_id_is_not_found() {
        let store = ConversationStore::new();

        match store.snapshot("unknown") {
            Err(StoreError::NotFound(id)) => assert_eq!(id, "unknown"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_then_ensure_starts_fresh() {
        let store = ConversationStore::new();

        store.append("c1", Role::User, "hello".to_string());
        assert!(store.clear("c1"));
        assert!(!store.clear("c1"));

        let first = store.append("c1", Role::User, "again".to_string());
        assert_eq!(first.sequence, 1);
    }

    #[test]
    fn test_concurrent_appends_same_id_are_gapless() {
        let store = Arc::new(ConversationStore::new());
        let writers = 8;
        let appends_per_writer = 50;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..appends_per_writer {
                        store.append("shared", Role::User, format!("w{}-{}", w, i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let turns = store.snapshot("shared").unwrap();
        assert_eq!(turns.len(), writers * appends_per_writer);

        // Strictly increasing with no gaps, regardless of interleaving.
        for (index, turn) in turns.iter().enumerate() {
            assert_eq!(turn.sequence, index as u64 + 1);
        }
    }

    #[test]
    fn test_concurrent_appends_different_ids_are_independent() {
        let store = Arc::new(ConversationStore::new());

        let handles: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = format!("c{}", w);
                    for i in 0..25 {
                        store.append(&id, Role::User, format!("msg-{}", i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for w in 0..4 {
            let turns = store.snapshot(&format!("c{}", w)).unwrap();
            assert_eq!(turns.len(), 25);
            assert_eq!(turns.last().unwrap().sequence, 25);
        }
    }

    #[test]
    fn test_total_turns_counts_across_conversations() {
        let store = ConversationStore::new();

        store.append("a", Role::User, "one".to_string());
        store.append("a", Role::Assistant, "two".to_string());
        store.append("b", Role::User, "three".to_string());

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_turns(), 3);
    }
}
