//! # Speech-to-Text Gateway Contract
//!
//! The transcription capability is an external collaborator reached over the
//! network. This module defines the seam: a pure bytes-to-text operation with
//! no retries and no access to conversation state. Whether and when to retry a
//! failed turn is the caller's decision.

use crate::audio::segment::AudioSegment;
use async_trait::async_trait;
use std::fmt;

/// Failure cases when transcribing one segment.
#[derive(Debug, Clone)]
pub enum TranscriptionError {
    /// Transport-level failure reaching the provider
    Request(String),
    /// Provider answered with a non-success status
    Provider { status: u16, message: String },
    /// Provider response carried no usable transcript
    InvalidResponse(String),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::Request(message) => {
                write!(f, "Transcription request failed: {}", message)
            }
            TranscriptionError::Provider { status, message } => {
                write!(f, "Transcription provider returned {}: {}", status, message)
            }
            TranscriptionError::InvalidResponse(message) => {
                write!(f, "Invalid transcription response: {}", message)
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// External speech-to-text capability.
///
/// Implementations suspend until the provider responds. They must not mutate
/// any conversation state and must not retry internally; a failure is surfaced
/// as-is to the caller.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one audio segment to text.
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String, TranscriptionError>;
}
