//! # Audio Capture Module
//!
//! Handles the capture side of the pipeline: turning a continuous stream of
//! audio frames and voice-activity boundary events into discrete segments the
//! transcription gateway can consume.
//!
//! ## Key Components:
//! - **Segmenter**: Two-state machine driven by speech boundary events
//! - **Segments**: Transient `{bytes, mime type, captured at}` spans of audio
//! - **WAV Framing**: PCM validation and RIFF containering for raw captures
//!
//! ## Audio Format Requirements:
//! - **Sample Rate**: 16kHz (16,000 Hz) default
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers

pub mod segment;      // Finalized audio segment type
pub mod segmenter;    // Boundary-event driven segmentation
pub mod wav;          // PCM validation and WAV containering

pub use segment::AudioSegment;
pub use segmenter::{CaptureEvent, Segmenter, SegmenterConfig, SegmenterHandle};
