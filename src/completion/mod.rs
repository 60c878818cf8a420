//! # Completion Module
//!
//! Reply generation as an external capability. The pipeline builds an ordered
//! prompt (system instruction plus conversation history) and this module turns
//! it into the assistant's reply text via the chat-completion provider.
//!
//! ## Key Components:
//! - **Gateway Contract**: The `ChatCompletion` seam and prompt message type
//! - **OpenAI Client**: JSON request to the chat completions API

pub mod gateway;     // ChatCompletion trait, message and error types
pub mod openai;      // OpenAI chat completions API client

pub use gateway::{ChatCompletion, ChatMessage, CompletionError};
pub use openai::OpenAiChatClient;
