//! # Transcription Module
//!
//! Speech-to-text as an external capability: one audio segment in, recognized
//! text out. There is no local inference here; the provider is reached over
//! HTTP and treated as a pure transformation.
//!
//! ## Key Components:
//! - **Gateway Contract**: The `SpeechToText` seam the pipeline depends on
//! - **OpenAI Client**: Multipart upload to the transcriptions API (Whisper)
//!
//! ## Failure Semantics:
//! No retries, no conversation-state access. Transport errors, provider error
//! statuses, and unusable responses all surface as `TranscriptionError` for
//! the caller to handle.

pub mod gateway;     // SpeechToText trait and error taxonomy
pub mod openai;      // OpenAI transcriptions API client

pub use gateway::{SpeechToText, TranscriptionError};
pub use openai::OpenAiTranscriber;
