//! # WebSocket Audio Streaming Handler
//!
//! Handles real-time audio streaming via WebSocket for conversational turns.
//! Clients connect to `/ws/audio` and stream raw PCM frames between speech
//! boundary markers; every finalized speech segment runs one full conversation
//! turn.
//!
//! ## WebSocket Protocol:
//! 1. **Start**: Client sends `{"type":"start","chat_id":...}`; a missing
//!    `chat_id` gets a freshly generated session id
//! 2. **Boundaries**: `{"type":"speech_start"}` / `{"type":"speech_end"}`
//!    bracket each utterance
//! 3. **Audio Streaming**: Binary messages carry PCM frames (16-bit
//!    little-endian by default) and are buffered only between boundaries
//! 4. **Turn Results**: The server pushes `{"type":"turn",...}` per completed
//!    segment and `{"type":"error",...}` per failure
//! 5. **Heartbeat**: JSON ping/pong with an idle timeout that closes dead
//!    connections
//!
//! Closing the connection mid-capture discards the unfinalized buffer.

use crate::audio::segment::AudioSegment;
use crate::audio::segmenter::{CaptureEvent, Segmenter, SegmenterConfig, SegmenterHandle};
use crate::audio::wav::{validate_pcm_frame, PcmFormat};
use crate::conversation::TurnError;
use crate::state::AppState;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Capture events buffered between the connection and the segmenter task.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// WebSocket message types for client-server communication.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Start a streaming session, optionally naming the conversation
    #[serde(rename = "start")]
    Start {
        /// Conversation to append turns to; absent means a fresh session id
        chat_id: Option<String>,
    },

    /// The client's voice-activity detector observed speech beginning
    #[serde(rename = "speech_start")]
    SpeechStart,

    /// The client's voice-activity detector observed speech ending
    #[serde(rename = "speech_end")]
    SpeechEnd,

    /// Session confirmation from server, echoing the effective conversation id
    #[serde(rename = "started")]
    Started { chat_id: String },

    /// One completed conversation turn from server
    #[serde(rename = "turn")]
    Turn {
        transcript: String,
        ai_response: String,
    },

    /// Error messages
    #[serde(rename = "error")]
    Error {
        /// Error code
        code: String,
        /// Human-readable error message
        message: String,
        /// Transcript retained in the conversation when only the reply failed
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },

    /// Heartbeat/ping message
    #[serde(rename = "ping")]
    Ping {
        /// Timestamp for latency measurement
        timestamp: u64,
    },

    /// Heartbeat/pong response
    #[serde(rename = "pong")]
    Pong {
        /// Original timestamp from ping
        timestamp: u64,
    },
}

/// WebSocket actor for handling audio streaming connections.
///
/// ## Actor Model:
/// Each connection is an independent actor. The segmenter runs as a separate
/// task bound to this connection; its finalized segments come back in as an
/// actor stream, so turn handling never blocks frame ingestion.
pub struct AudioWebSocket {
    /// Shared application state
    state: web::Data<AppState>,

    /// Conversation this session appends to, set by the start message
    chat_id: Option<String>,

    /// Capture events into the segmenter; `None` until started, dropped on stop
    events: Option<mpsc::Sender<CaptureEvent>>,

    /// Running segmenter binding for this connection
    segmenter: Option<SegmenterHandle>,

    /// PCM format expected from this client
    format: PcmFormat,

    /// Segment suppression floor from the audio configuration
    min_segment_bytes: usize,

    /// Last heartbeat time
    last_heartbeat: Instant,
}

impl AudioWebSocket {
    /// Create a new WebSocket actor.
    pub fn new(state: web::Data<AppState>) -> Self {
        let config = state.get_config();
        Self {
            state,
            chat_id: None,
            events: None,
            segmenter: None,
            format: config.audio.pcm_format(),
            min_segment_bytes: config.audio.min_segment_bytes,
            last_heartbeat: Instant::now(),
        }
    }

    /// Handle the start message: bind a segmenter and settle the conversation id.
    fn handle_start(&mut self, chat_id: Option<String>, ctx: &mut ws::WebsocketContext<Self>) {
        if self.events.is_some() {
            self.send_error(ctx, "already_started", "Session already started");
            return;
        }

        let chat_id = chat_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.state.lifecycle.start());
        self.state.store.ensure(&chat_id);

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let segmenter = Segmenter::new(SegmenterConfig {
            format: self.format.clone(),
            min_segment_bytes: self.min_segment_bytes,
        });
        let mut handle = segmenter.start(events_rx);

        if let Some(segments) = handle.take_segments() {
            ctx.add_stream(ReceiverStream::new(segments));
        }

        self.events = Some(events_tx);
        self.segmenter = Some(handle);
        self.chat_id = Some(chat_id.clone());

        info!(chat_id = %chat_id, "Streaming session started");
        self.send_message(ctx, &WsMessage::Started { chat_id });
    }

    /// Forward one capture event into the segmenter.
    fn forward_event(&mut self, event: CaptureEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match self.events.as_ref() {
            Some(events) => match events.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Capture event dropped, segmenter backlog full");
                    self.send_error(
                        ctx,
                        "audio_backlog",
                        "Audio is arriving faster than it can be processed",
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    error!("Segmenter task is gone, closing connection");
                    ctx.stop();
                }
            },
            None => {
                self.send_error(
                    ctx,
                    "not_started",
                    "Session not started. Send a start message first.",
                );
            }
        }
    }

    /// Handle one binary PCM frame from the client.
    fn handle_frame(&mut self, data: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        if self.events.is_none() {
            self.send_error(
                ctx,
                "not_started",
                "Session not started. Send a start message first.",
            );
            return;
        }

        if let Err(err) = validate_pcm_frame(data, &self.format) {
            self.send_error(ctx, "invalid_audio", &format!("Invalid audio: {}", err));
            return;
        }

        self.forward_event(CaptureEvent::Frame(data.to_vec()), ctx);
    }

    /// Run one orchestrated turn for a finalized segment.
    fn run_turn(&self, segment: AudioSegment, ctx: &mut ws::WebsocketContext<Self>) {
        let chat_id = match &self.chat_id {
            Some(id) => id.clone(),
            None => return,
        };

        let engine = self.state.current_engine();
        let addr = ctx.address();

        tokio::spawn(async move {
            match engine.handle_turn(&chat_id, segment).await {
                Ok(exchange) => {
                    addr.do_send(TurnCompleted {
                        transcript: exchange.user_text,
                        ai_response: exchange.assistant_text,
                    });
                }
                Err(err) => {
                    // Detailed provider errors were already logged by the engine;
                    // the client gets the generic category.
                    let (code, message, transcript) = match err {
                        TurnError::Transcription(_) => {
                            ("transcription_error", "Failed to transcribe audio", None)
                        }
                        TurnError::Completion { transcript, .. } => (
                            "completion_error",
                            "Failed to generate a reply",
                            Some(transcript),
                        ),
                    };

                    let error_msg = WsMessage::Error {
                        code: code.to_string(),
                        message: message.to_string(),
                        transcript,
                    };

                    if let Ok(json) = serde_json::to_string(&error_msg) {
                        addr.do_send(SendText(json));
                    }
                }
            }
        });
    }

    /// Send a protocol message to the client.
    fn send_message(&self, ctx: &mut ws::WebsocketContext<Self>, message: &WsMessage) {
        if let Ok(json) = serde_json::to_string(message) {
            ctx.text(json);
        }
    }

    /// Send an error message to the client.
    fn send_error(&self, ctx: &mut ws::WebsocketContext<Self>, code: &str, message: &str) {
        let error_msg = WsMessage::Error {
            code: code.to_string(),
            message: message.to_string(),
            transcript: None,
        };

        if let Ok(json) = serde_json::to_string(&error_msg) {
            ctx.text(json);
        }

        warn!("WebSocket error {}: {}", code, message);
    }
}

/// Message for sending text to the WebSocket client.
#[derive(Message)]
#[rtype(result = "()")]
struct SendText(String);

/// Message carrying a completed turn back to the connection actor.
#[derive(Message)]
#[rtype(result = "()")]
struct TurnCompleted {
    transcript: String,
    ai_response: String,
}

/// Implement Actor trait for WebSocket handling.
impl Actor for AudioWebSocket {
    type Context = ws::WebsocketContext<Self>;

    /// Called when the WebSocket connection starts.
    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection started");
        self.state.increment_active_sessions();

        // Start heartbeat timer
        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            // Check if client is still responsive
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(60) {
                warn!("WebSocket heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                // Send ping
                let ping_msg = WsMessage::Ping {
                    timestamp: std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap()
                        .as_millis() as u64,
                };

                if let Ok(json) = serde_json::to_string(&ping_msg) {
                    ctx.text(json);
                }
            }
        });
    }

    /// Called when the WebSocket connection stops.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Tears down the segmenter binding; an in-flight buffer is discarded,
        // never finalized.
        self.events.take();
        self.segmenter.take();
        self.state.decrement_active_sessions();

        info!(chat_id = ?self.chat_id, "WebSocket connection stopped");
    }
}

/// Handle incoming WebSocket messages.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for AudioWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                // Handle JSON messages
                match serde_json::from_str::<WsMessage>(&text) {
                    Ok(WsMessage::Start { chat_id }) => {
                        self.handle_start(chat_id, ctx);
                    }
                    Ok(WsMessage::SpeechStart) => {
                        self.forward_event(CaptureEvent::SpeechStart, ctx);
                    }
                    Ok(WsMessage::SpeechEnd) => {
                        self.forward_event(CaptureEvent::SpeechEnd, ctx);
                    }
                    Ok(WsMessage::Pong { .. }) => {
                        self.last_heartbeat = Instant::now();
                    }
                    Ok(_) => {
                        warn!("Received unexpected message type from client");
                    }
                    Err(err) => {
                        self.send_error(ctx, "invalid_json", &format!("Invalid JSON: {}", err));
                    }
                }
            }
            Ok(ws::Message::Binary(data)) => {
                self.handle_frame(&data, ctx);
            }
            Ok(ws::Message::Ping(data)) => {
                ctx.pong(&data);
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("WebSocket closed: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!("Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// Handle finalized segments coming back from the segmenter task.
impl StreamHandler<AudioSegment> for AudioWebSocket {
    fn handle(&mut self, segment: AudioSegment, ctx: &mut Self::Context) {
        debug!(bytes = segment.len(), "Segment finalized, running turn");
        self.run_turn(segment, ctx);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // The segment stream closes during teardown; the connection itself
        // decides when to stop.
        debug!("Segment stream ended");
    }
}

/// Handle SendText messages.
impl Handler<SendText> for AudioWebSocket {
    type Result = ();

    fn handle(&mut self, msg: SendText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

/// Handle TurnCompleted messages.
impl Handler<TurnCompleted> for AudioWebSocket {
    type Result = ();

    fn handle(&mut self, msg: TurnCompleted, ctx: &mut Self::Context) {
        let turn_msg = WsMessage::Turn {
            transcript: msg.transcript,
            ai_response: msg.ai_response,
        };

        if let Ok(json) = serde_json::to_string(&turn_msg) {
            ctx.text(json);
        }
    }
}

/// WebSocket endpoint handler.
///
/// ## HTTP to WebSocket Upgrade:
/// This function handles the initial HTTP request and upgrades it to a WebSocket
/// connection. The actual communication is handled by the AudioWebSocket actor.
pub async fn audio_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    info!(
        "New WebSocket connection request from: {:?}",
        req.connection_info().peer_addr()
    );

    let websocket = AudioWebSocket::new(app_state);
    ws::start(websocket, &req, stream)
}
