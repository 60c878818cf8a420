//! # Cure AI Backend - Main Application Entry Point
//!
//! This is the main entry point for the cure-ai-backend web server: a
//! proof-of-concept voice assistant backend that turns uploaded or streamed
//! speech into conversational turns against a chat-completion provider.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: The entire application is asynchronous for better performance
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc & RwLock**: Thread-safe shared state management
//! - **static**: Global variables that live for the entire program duration
//!
//! ## Application Architecture:
//! - **config**: Handles application configuration (TOML files + environment variables)
//! - **state**: Manages shared application state (conversation store, engine, metrics)
//! - **conversation**: Turn storage plus orchestration and summaries
//! - **audio**: Speech segmentation and WAV containering for the streaming path
//! - **transcription / completion**: Clients for the external AI providers
//! - **handlers**: HTTP request handlers for API endpoints
//! - **websocket**: Real-time audio streaming connections
//! - **error**: Custom error types and HTTP error responses

// Module declarations - These tell Rust about our other source files
mod audio; // Audio segmentation and WAV containering (audio/ directory)
mod completion; // Chat-completion provider client (completion/ directory)
mod config; // Configuration management (config.rs)
mod conversation; // Conversation storage and orchestration (conversation/ directory)
mod error; // Error handling types (error.rs)
mod handlers; // HTTP request handlers (handlers/ directory)
mod health; // Health check endpoints (health.rs)
mod middleware; // Custom middleware (middleware/ directory)
mod state; // Application state management (state.rs)
mod transcription; // Speech-to-text provider client (transcription/ directory)
mod websocket; // WebSocket audio streaming (websocket.rs)

// External crate imports - These are dependencies from Cargo.toml
use actix_cors::Cors; // Cross-Origin Resource Sharing support
use actix_web::{web, App, HttpServer}; // Web framework
use anyhow::Result; // Better error handling with context
use config::AppConfig; // Our custom configuration struct
use state::AppState; // Our custom application state
use std::sync::atomic::{AtomicBool, Ordering}; // Thread-safe boolean for shutdown
use tracing::{error, info, warn}; // Structured logging
use tracing_actix_web::TracingLogger; // Request spans for every HTTP request
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // Logging setup

/// Global shutdown signal that can be accessed from anywhere in the program.
/// AtomicBool is thread-safe, meaning multiple threads can safely read/write to it.
/// This is used to signal when the server should gracefully shut down.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Creates shared application state** (conversation store, provider clients, metrics)
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Handles graceful shutdown** when receiving system signals
///
/// ## Key Rust Concepts:
/// - `#[actix_web::main]`: This macro sets up the async runtime (like a JavaScript event loop)
/// - `async fn`: This function can be paused and resumed, allowing other work to happen
/// - `Result<()>`: This function returns either success (Ok(())) or an error (Err(error))
/// - `?`: The question mark operator automatically returns early if there's an error
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // .ok() means "ignore errors" - it's fine if there's no .env file
    dotenv::dotenv().ok();

    // Set up structured logging (tracing) for debugging and monitoring
    init_tracing()?;

    // Load application configuration from config.toml and environment variables
    let config = AppConfig::load()?;
    // Validate that the configuration makes sense (e.g., port isn't 0)
    config.validate()?;

    // Log startup information - these appear in the console when you run the server
    info!("Starting cure-ai-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    if config.openai.api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; provider calls will fail until it is configured");
    }

    // Create the shared application state that all HTTP requests can access
    // This includes configuration, the conversation store, provider clients,
    // metrics, and the server start time
    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    // Set up signal handlers for graceful shutdown (Ctrl+C, SIGTERM, etc.)
    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    // Create the HTTP server with all its configuration
    let server = HttpServer::new(move || {
        // Configure CORS (Cross-Origin Resource Sharing) to allow web browsers to connect
        let cors = Cors::default()
            .allow_any_origin() // Allow requests from any domain
            .allow_any_method() // Allow GET, POST, PUT, DELETE, etc.
            .allow_any_header() // Allow any HTTP headers
            .max_age(3600); // Cache CORS settings for 1 hour

        // Create the main application with all its configuration
        App::new()
            // Share our application state with all request handlers
            .app_data(web::Data::new(app_state.clone()))
            // Add middleware in order (they execute in reverse order for responses)
            .wrap(cors) // Handle CORS
            .wrap(TracingLogger::default()) // Request spans and access logs
            .wrap(middleware::Telemetry) // Collect performance metrics
            // Define API routes under the /api prefix
            .service(
                web::scope("/api")
                    .route("/stt", web::post().to(handlers::speech_to_text))
                    .route("/summary", web::get().to(handlers::get_summary))
                    .route("/conversation", web::delete().to(handlers::clear_conversation))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config)),
            )
            // Streaming audio connections
            .route("/ws/audio", web::get().to(websocket::audio_websocket))
            // Liveness and monitoring endpoints at the root level
            .route("/", web::get().to(health::root_status))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
    })
    .bind(&bind_addr)? // Bind to the configured host and port
    .run(); // Start the server (but don't block here)

    // Get a handle to control the server and spawn it in a separate task
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Wait for either the server to finish OR a shutdown signal
    // tokio::select! is like a "race" - whichever finishes first wins
    tokio::select! {
        // If the server task finishes (which usually means an error)
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        // If we receive a shutdown signal (Ctrl+C, SIGTERM, etc.)
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;  // Gracefully stop the server
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info", "cure_ai_backend=debug")
/// - If not set, defaults to "cure_ai_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            // Try to read RUST_LOG environment variable, or use defaults
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cure_ai_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer()) // Format logs nicely for console output
        .init(); // Actually start the logging system

    Ok(())
}

/// Set up signal handlers for graceful shutdown.
///
/// ## What this does:
/// - Listens for SIGTERM (termination signal from system)
/// - Listens for SIGINT (interrupt signal, usually Ctrl+C)
/// - When either signal is received, sets the global shutdown flag
///
/// ## Why this matters:
/// Graceful shutdown means the server can finish processing current requests
/// before shutting down, rather than just stopping immediately.
fn setup_signal_handlers() {
    tokio::spawn(async {
        // Set up handlers for different types of shutdown signals
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        // Wait for either signal to arrive
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        // Set the global shutdown flag so other parts of the program know to stop
        // SeqCst (Sequential Consistency) ensures this change is visible to all threads
        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set.
///
/// ## What this does:
/// - Continuously checks if the shutdown signal has been set
/// - Sleeps for 100ms between checks to avoid busy-waiting
/// - Returns when shutdown has been requested
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        // Sleep for 100ms, then check again
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
