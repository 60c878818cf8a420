//! # Chat-Completion Gateway Contract
//!
//! The reply-generation capability is an external chat-completion service.
//! The pipeline hands it an ordered message list (system instruction first,
//! then the conversation history) and receives the assistant's reply text.
//! No retries; failures surface to the caller.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// One message in a chat-completion prompt, in provider wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// The fixed system instruction that opens every prompt.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Failure cases when requesting a completion.
#[derive(Debug, Clone)]
pub enum CompletionError {
    /// Transport-level failure reaching the provider
    Request(String),
    /// Provider answered with a non-success status
    Provider { status: u16, message: String },
    /// Provider response carried no reply content
    InvalidResponse(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Request(message) => {
                write!(f, "Completion request failed: {}", message)
            }
            CompletionError::Provider { status, message } => {
                write!(f, "Completion provider returned {}: {}", status, message)
            }
            CompletionError::InvalidResponse(message) => {
                write!(f, "Invalid completion response: {}", message)
            }
        }
    }
}

impl std::error::Error for CompletionError {}

/// External chat-completion capability.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Generate the assistant reply for an ordered prompt.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}
