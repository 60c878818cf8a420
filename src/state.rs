//! # Application State Management
//!
//! This module manages shared state that needs to be accessed by multiple HTTP request handlers
//! simultaneously.
//!
//! ## Key Rust Concepts (IMPORTANT for beginners):
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: Multiple HTTP requests run simultaneously and all need access to the same state
//! - **Memory safety**: Automatically cleans up data when the last reference is dropped
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time (but not both)
//! - **Why needed**: Multiple requests can read config simultaneously, but only one can update it
//!
//! ### Arc<RwLock<T>> Pattern
//! - **Arc**: Multiple ownership (many HTTP handlers can hold a reference)
//! - **RwLock**: Thread-safe read/write access
//! - **T**: The actual data type being protected
//!
//! ## Engine swapping:
//! The conversation engine holds provider clients built from the configuration
//! (API key, model names, system prompt). Runtime config updates rebuild the
//! engine and swap it behind `Arc<RwLock<Arc<...>>>`, so in-flight turns keep
//! their engine while new requests pick up the fresh one. The store is never
//! rebuilt; history survives provider swaps.

use crate::completion::OpenAiChatClient;
use crate::config::AppConfig;
use crate::conversation::{ConversationEngine, ConversationStore, SessionLifecycle};
use crate::transcription::OpenAiTranscriber;
use std::collections::HashMap; // For storing per-endpoint metrics
use std::sync::{Arc, RwLock}; // Thread-safe shared ownership and locking
use std::time::Instant; // For tracking server uptime

/// The main application state that's shared across all HTTP request handlers.
///
/// ## Thread Safety Pattern:
/// All mutable data sits behind Arc<RwLock<T>>:
/// - Multiple HTTP requests can read the same data simultaneously
/// - Only one request can modify data at a time
/// - No data races or memory corruption possible
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// All conversations, shared by every handler and never rebuilt
    pub store: Arc<ConversationStore>,

    /// Turn orchestration engine; swapped out when the configuration changes
    pub engine: Arc<RwLock<Arc<ConversationEngine>>>,

    /// Session start/end helper over the store
    pub lifecycle: Arc<SessionLifecycle>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes, so no Arc<RwLock> needed)
    pub start_time: Instant,
}

/// Performance metrics collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count**: Total requests processed (for load monitoring)
/// - **error_count**: Total errors (for reliability monitoring)
/// - **active_sessions**: Current streaming audio connections (for capacity planning)
/// - **endpoint_metrics**: Per-endpoint statistics (for performance optimization)
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Current number of open streaming audio connections
    pub active_sessions: u32,

    /// Detailed metrics for each API endpoint (URL path)
    /// Key: endpoint name (e.g., "GET /health")
    /// Value: detailed metrics for that endpoint
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

/// Builds the turn engine from the current configuration.
///
/// The store is passed in rather than created here so that engine rebuilds
/// keep pointing at the same conversation history.
fn build_engine(config: &AppConfig, store: Arc<ConversationStore>) -> ConversationEngine {
    let transcriber = OpenAiTranscriber::new(
        config.openai.api_key.clone(),
        config.openai.transcription_model.clone(),
    )
    .with_api_base(config.openai.api_base.clone());

    let completer = OpenAiChatClient::new(
        config.openai.api_key.clone(),
        config.openai.chat_model.clone(),
    )
    .with_api_base(config.openai.api_base.clone());

    ConversationEngine::new(
        store,
        Arc::new(transcriber),
        Arc::new(completer),
        config.openai.system_prompt.clone(),
    )
}

/// Implementation of methods for AppState.
impl AppState {
    /// Create a new AppState with the given configuration.
    ///
    /// ## What this does:
    /// 1. Creates the shared conversation store and session lifecycle
    /// 2. Builds the turn engine from the configuration
    /// 3. Wraps everything for thread-safe sharing
    /// 4. Records the current time as the server start time
    pub fn new(config: AppConfig) -> Self {
        let store = Arc::new(ConversationStore::new());
        let lifecycle = Arc::new(SessionLifecycle::new(Arc::clone(&store)));
        let engine = Arc::new(build_engine(&config, Arc::clone(&store)));

        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            engine: Arc::new(RwLock::new(engine)),
            lifecycle,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// ## Why clone:
    /// Cloning releases the lock immediately, so other threads aren't blocked.
    /// AppConfig is designed to be cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Update the configuration with validation and rebuild the engine.
    ///
    /// ## Ordering:
    /// 1. Validate the candidate configuration (reject without touching anything)
    /// 2. Swap the configuration
    /// 3. Build a fresh engine from it and swap that in
    ///
    /// In-flight turns finish on the engine they started with; requests that
    /// arrive after the swap see the new providers.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        if let Err(e) = new_config.validate() {
            return Err(e.to_string());
        }

        let engine = Arc::new(build_engine(&new_config, Arc::clone(&self.store)));
        *self.config.write().unwrap() = new_config;
        *self.engine.write().unwrap() = engine;
        Ok(())
    }

    /// Grab the current engine for one turn.
    ///
    /// The clone is an Arc bump; the read lock is released before any await.
    pub fn current_engine(&self) -> Arc<ConversationEngine> {
        self.engine.read().unwrap().clone()
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    ///
    /// ## When this is called:
    /// - HTTP 4xx errors (client errors like 404 Not Found)
    /// - HTTP 5xx errors (server errors like 500 Internal Server Error)
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: The API endpoint (e.g., "GET /health", "POST /api/stt")
    /// - **duration_ms**: How long the request took to process (in milliseconds)
    /// - **is_error**: Whether this request resulted in an error
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        // Get or create metrics for this specific endpoint
        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Increment the active sessions counter (called when a streaming connection opens).
    pub fn increment_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
    }

    /// Decrement the active sessions counter (called when a streaming connection closes).
    ///
    /// ## Safety check:
    /// Includes a check to prevent underflow (going below zero), which would
    /// panic on u32.
    pub fn decrement_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// ## Why a snapshot:
    /// Takes a read lock for consistent data, then clones so the lock isn't
    /// held while the HTTP response is being serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_sessions: metrics.active_sessions,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Implementation of utility methods for EndpointMetric.
impl EndpointMetric {
    /// Calculate the average response time for this endpoint.
    ///
    /// ## Formula:
    /// Average = Total Duration / Number of Requests
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0 // No requests yet, so no average to calculate
        }
    }

    /// Calculate the error rate for this endpoint as a fraction (0.0 to 1.0).
    ///
    /// ## Formula:
    /// Error Rate = Number of Errors / Total Requests
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0 // No requests yet, so no errors possible
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn test_endpoint_metric_calculations() {
        let metric = EndpointMetric {
            request_count: 10,
            total_duration_ms: 500,
            error_count: 5,
        };
        assert_eq!(metric.average_duration_ms(), 50.0);
        assert_eq!(metric.error_rate(), 0.5);

        let empty = EndpointMetric::default();
        assert_eq!(empty.average_duration_ms(), 0.0);
        assert_eq!(empty.error_rate(), 0.0);
    }

    #[test]
    fn test_config_update_preserves_conversation_history() {
        let state = AppState::new(AppConfig::default());
        state
            .store
            .append("c1", Role::User, "hello".to_string());

        let mut updated = state.get_config();
        updated.openai.chat_model = "gpt-4o".to_string();
        state.update_config(updated).unwrap();

        // The engine was rebuilt but the store kept its history.
        assert_eq!(state.get_config().openai.chat_model, "gpt-4o");
        assert_eq!(state.store.snapshot("c1").unwrap().len(), 1);
    }

    #[test]
    fn test_config_update_rejects_invalid_candidate() {
        let state = AppState::new(AppConfig::default());
        let mut bad = state.get_config();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());
        // The stored configuration is untouched.
        assert_eq!(state.get_config().server.port, 8000);
    }

    #[test]
    fn test_session_counters_never_underflow() {
        let state = AppState::new(AppConfig::default());
        state.decrement_active_sessions();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);

        state.increment_active_sessions();
        state.increment_active_sessions();
        state.decrement_active_sessions();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 1);
    }
}
