//! # Conversation Module
//!
//! Everything that remembers and replays what was said: the turn and
//! conversation types, the concurrent store keyed by conversation id, the
//! turn orchestration engine, the summary projection, and session lifecycle
//! helpers.

pub mod engine; // Turn orchestration: transcribe, append, complete, append
pub mod session; // Session start/end lifecycle
pub mod store; // Concurrent conversation storage
pub mod summary; // Read-only transcript projection
pub mod turn; // Turn, Role, and Conversation types

// Re-export commonly used types
pub use engine::{ConversationEngine, TurnError, TurnExchange};
pub use session::SessionLifecycle;
pub use store::{ConversationStore, StoreError, DEFAULT_CONVERSATION_ID};
pub use summary::summarize;
pub use turn::{Conversation, Role, Turn};
