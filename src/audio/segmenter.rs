//! # Speech Segmenter
//!
//! Turns a continuous audio capture stream plus voice-activity boundary events
//! into discrete, finalized audio segments. The voice-activity detector itself
//! is an external collaborator; this module only consumes its `speech-start` /
//! `speech-end` signals.
//!
//! ## State Machine:
//! Two states, `idle` and `capturing`:
//! - `speech-start` while idle begins a new buffer; while capturing it is a
//!   no-op (idempotent).
//! - Audio frames are buffered only while capturing; frames while idle are
//!   dropped.
//! - `speech-end` while capturing finalizes the buffer into one segment and
//!   returns to idle. A `speech-end` with zero buffered bytes emits nothing.
//!
//! Stopping the segmenter discards any in-flight buffer (it is never
//! finalized) and releases the event binding, on every exit path including
//! abnormal termination of the owner.

use crate::audio::segment::AudioSegment;
use crate::audio::wav::{wrap_pcm, PcmFormat};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Buffered segments waiting for a slow consumer before emission backpressures.
const SEGMENT_CHANNEL_CAPACITY: usize = 16;

/// One observation from the capture stream or its voice-activity detector.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The detector observed speech beginning
    SpeechStart,
    /// The detector observed speech ending
    SpeechEnd,
    /// A raw PCM frame from the capture stream
    Frame(Vec<u8>),
}

/// Tuning for segment finalization.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// PCM parameters of the incoming frames
    pub format: PcmFormat,

    /// Segments smaller than this many PCM bytes are suppressed as blips.
    /// Zero means only truly empty buffers are suppressed.
    pub min_segment_bytes: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            format: PcmFormat::default(),
            min_segment_bytes: 0,
        }
    }
}

/// The synchronous two-state core of the segmenter.
///
/// Kept free of tasks and channels so transitions are directly testable;
/// [`Segmenter`] wraps it in an event-driven task.
#[derive(Debug)]
pub struct SegmenterState {
    config: SegmenterConfig,

    /// `Some` while capturing, holding the PCM bytes buffered so far
    buffer: Option<Vec<u8>>,
}

impl SegmenterState {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            buffer: None,
        }
    }

    /// True while between a `speech-start` and its `speech-end`.
    pub fn is_capturing(&self) -> bool {
        self.buffer.is_some()
    }

    /// Apply one capture event.
    ///
    /// ## Returns:
    /// The finalized segment when this event completed one, otherwise `None`.
    pub fn on_event(&mut self, event: CaptureEvent) -> Option<AudioSegment> {
        match event {
            CaptureEvent::SpeechStart => {
                if self.buffer.is_none() {
                    trace!("Speech started, capturing");
                    self.buffer = Some(Vec::new());
                }
                None
            }
            CaptureEvent::Frame(data) => {
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.extend_from_slice(&data);
                }
                None
            }
            CaptureEvent::SpeechEnd => match self.buffer.take() {
                Some(pcm) if !pcm.is_empty() && pcm.len() >= self.config.min_segment_bytes => {
                    let duration = self.config.format.duration_seconds(pcm.len());
                    debug!(
                        pcm_bytes = pcm.len(),
                        duration_seconds = format!("{:.2}", duration),
                        "Finalized audio segment"
                    );
                    Some(AudioSegment::wav(wrap_pcm(&pcm, &self.config.format)))
                }
                Some(pcm) => {
                    if !pcm.is_empty() {
                        debug!(pcm_bytes = pcm.len(), "Suppressed sub-minimum segment");
                    }
                    None
                }
                None => None,
            },
        }
    }

    /// Drop any in-flight buffer without finalizing it. Returns the number of
    /// bytes discarded.
    pub fn discard(&mut self) -> usize {
        self.buffer.take().map(|pcm| pcm.len()).unwrap_or(0)
    }
}

/// Event-driven segmenter that owns a [`SegmenterState`] inside a task.
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Bind the segmenter to a capture event stream.
    ///
    /// Spawns a task that consumes `events` until the channel closes, sending
    /// each finalized segment into the handle's output channel. Dropping the
    /// returned handle aborts the task and releases the binding.
    pub fn start(&self, events: mpsc::Receiver<CaptureEvent>) -> SegmenterHandle {
        let (segment_tx, segment_rx) = mpsc::channel(SEGMENT_CHANNEL_CAPACITY);
        let state = SegmenterState::new(self.config.clone());

        let task = tokio::spawn(run_segmenter(state, events, segment_tx));

        SegmenterHandle {
            task,
            segments: Some(segment_rx),
        }
    }
}

async fn run_segmenter(
    mut state: SegmenterState,
    mut events: mpsc::Receiver<CaptureEvent>,
    segment_tx: mpsc::Sender<AudioSegment>,
) {
    while let Some(event) = events.recv().await {
        if let Some(segment) = state.on_event(event) {
            if segment_tx.send(segment).await.is_err() {
                // Consumer went away; nothing left to emit to.
                break;
            }
        }
    }

    let discarded = state.discard();
    if discarded > 0 {
        debug!(pcm_bytes = discarded, "Discarded in-flight audio buffer on stop");
    }
}

/// Running segmenter binding. The in-flight buffer is discarded and the task
/// torn down when this handle is stopped or dropped.
pub struct SegmenterHandle {
    task: JoinHandle<()>,

    /// Finalized segments, in emission order; `None` after `take_segments`
    segments: Option<mpsc::Receiver<AudioSegment>>,
}

impl SegmenterHandle {
    /// Receive the next finalized segment, or `None` once the capture stream
    /// has ended.
    pub async fn next_segment(&mut self) -> Option<AudioSegment> {
        match self.segments.as_mut() {
            Some(segments) => segments.recv().await,
            None => None,
        }
    }

    /// Take ownership of the segment channel, for consumers that integrate it
    /// into their own stream handling.
    pub fn take_segments(&mut self) -> Option<mpsc::Receiver<AudioSegment>> {
        self.segments.take()
    }

    /// Stop the segmenter, discarding any in-flight buffer.
    pub fn stop(self) {
        // Drop runs the teardown.
    }
}

impl Drop for SegmenterHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
