//! # Audio Segments
//!
//! A segment is one contiguous span of captured audio bounded by detected
//! speech/silence events. Segments are transient: they exist between emission
//! and transcription and are never persisted.

use chrono::{DateTime, Utc};

/// MIME type for browser-recorded blobs.
pub const MIME_WEBM: &str = "audio/webm";

/// MIME type for segments the segmenter finalizes from raw PCM frames.
pub const MIME_WAV: &str = "audio/wav";

/// One finalized span of captured audio, ready for transcription.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,

    /// MIME type of `bytes`
    pub mime_type: String,

    /// When the segment was captured/finalized
    pub captured_at: DateTime<Utc>,
}

impl AudioSegment {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            captured_at: Utc::now(),
        }
    }

    /// Segment from a browser-recorded upload blob.
    pub fn webm(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MIME_WEBM)
    }

    /// Segment from a WAV-containered PCM capture.
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self::new(bytes, MIME_WAV)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Filename used when uploading this segment to the transcription provider.
    pub fn upload_filename(&self) -> &'static str {
        if self.mime_type == MIME_WAV {
            "recording.wav"
        } else {
            "recording.webm"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_filename_follows_mime_type() {
        assert_eq!(AudioSegment::webm(vec![1, 2]).upload_filename(), "recording.webm");
        assert_eq!(AudioSegment::wav(vec![1, 2]).upload_filename(), "recording.wav");
    }

    #[test]
    fn test_segment_is_stamped_on_creation() {
        let before = Utc::now();
        let segment = AudioSegment::webm(vec![0u8; 4]);
        assert!(segment.captured_at >= before);
        assert_eq!(segment.len(), 4);
        assert!(!segment.is_empty());
    }
}
