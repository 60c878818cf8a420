//! # Session Lifecycle
//!
//! Creates and tears down conversation identifiers. Holds no state of its own
//! beyond the id-generation policy: freshly minted UUID v4 tokens, unique for
//! the process lifetime with negligible collision probability. Cleared ids are
//! never handed out again.

use crate::conversation::store::ConversationStore;
use std::sync::Arc;
use uuid::Uuid;

/// Start/end surface for conversation sessions.
pub struct SessionLifecycle {
    store: Arc<ConversationStore>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    /// Mint a fresh conversation id and register an empty conversation for it.
    pub fn start(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.store.ensure(&id);
        tracing::debug!(conversation_id = %id, "Started conversation session");
        id
    }

    /// End a session, dropping its conversation and all turns. Returns whether
    /// anything existed to clear.
    pub fn end(&self, id: &str) -> bool {
        let existed = self.store.clear(id);
        tracing::debug!(conversation_id = %id, existed, "Ended conversation session");
        existed
    }
}
