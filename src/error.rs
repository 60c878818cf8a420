//! # Error Handling
//!
//! This module defines custom error types and how they're converted to HTTP responses.
//! This is a great example of Rust's powerful error handling system.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **T**: The success type (what you get when everything works)
//! - **E**: The error type (what you get when something goes wrong)
//! - **No exceptions**: Rust doesn't have try/catch, it uses Result instead
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of error
//! - **Data**: Each variant can hold additional information (String, numbers, etc.)
//! - **Pattern matching**: Use `match` to handle different error types
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts between error types
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings
//!
//! ## Provider Detail Policy:
//! Failures from the speech-to-text and chat-completion providers are logged
//! with full detail at the failure site, but the HTTP response carries only a
//! generic message. Provider internals never reach API clients.

use actix_web::{HttpResponse, ResponseError}; // Web framework error handling
use serde_json::json; // For creating JSON error responses
use std::fmt; // For implementing Display trait

use crate::completion::CompletionError;
use crate::conversation::{StoreError, TurnError};
use crate::transcription::TranscriptionError;

/// Custom error types for the application.
///
/// ## Rust Concepts:
/// - **enum**: A type that can be one of several variants
/// - **String**: Each variant holds an error message
/// - **#[derive(Debug)]**: Automatically implements debug printing
///
/// ## Error Categories:
/// - **Internal**: Server-side problems (500 errors)
/// - **BadRequest**: Client sent invalid data (400 errors)
/// - **UploadMissing**: Multipart request without the audio part (400 errors)
/// - **NotFound**: Requested resource doesn't exist (404 errors)
/// - **Transcription**: Speech-to-text provider failure (500 errors)
/// - **Completion**: Chat-completion provider failure (500 errors)
/// - **ConfigError**: Configuration problems (500 errors)
/// - **ValidationError**: Data validation failed (400 errors)
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::BadRequest("Invalid JSON".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors (lock poisoning, unexpected state, etc.)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Multipart upload arrived without an audio part
    UploadMissing(String),

    /// Requested resource was not found
    NotFound(String),

    /// The speech-to-text provider failed or returned an unusable result
    Transcription(String),

    /// The chat-completion provider failed or returned an unusable result
    Completion(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),
}

/// Implementation of the Display trait for AppError.
///
/// ## Purpose:
/// This trait defines how errors are formatted as human-readable strings.
/// It's used when you print an error or convert it to a string.
///
/// ## Rust Concepts:
/// - **impl Trait for Type**: Implementing a trait for our custom type
/// - **match**: Pattern matching to handle each error variant
/// - **write!**: Macro for formatting strings (like printf in C)
/// - **&self**: Immutable reference to the error
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::UploadMissing(msg) => write!(f, "Upload missing: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Transcription(msg) => write!(f, "Transcription error: {}", msg),
            AppError::Completion(msg) => write!(f, "Completion error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

/// Implementation of the ResponseError trait for AppError.
///
/// ## Purpose:
/// This trait converts our custom errors into HTTP responses that clients can understand.
/// It automatically handles the conversion when an error is returned from a handler.
///
/// ## HTTP Status Code Mapping:
/// - Internal/Transcription/Completion/ConfigError → 500 (Internal Server Error)
/// - BadRequest/UploadMissing/ValidationError → 400 (Bad Request)
/// - NotFound → 404 (Not Found)
///
/// ## JSON Response Format:
/// All errors return JSON with a consistent structure:
/// ```json
/// {
///   "error": {
///     "type": "upload_missing",
///     "message": "No audio file uploaded",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        // Map each error type to HTTP status code, error type, and message
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, // 500
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST, // 400
                "bad_request",
                msg.clone(),
            ),
            AppError::UploadMissing(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST, // 400
                "upload_missing",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND, // 404
                "not_found",
                msg.clone(),
            ),
            AppError::Transcription(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, // 500
                "transcription_error",
                msg.clone(),
            ),
            AppError::Completion(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, // 500
                "completion_error",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, // 500
                "config_error",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST, // 400
                "validation_error",
                msg.clone(),
            ),
        };

        // Build the HTTP response with JSON body
        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,           // Machine-readable error type
                "message": message,           // Human-readable error message
                "timestamp": chrono::Utc::now().to_rfc3339()  // When the error occurred
            }
        }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// ## Rust Concepts:
/// - **From trait**: Enables automatic conversion with `.into()` or `?`
/// - **Self**: Refers to AppError (the type we're implementing for)
///
/// ## Usage:
/// When you use `?` with an anyhow::Error, it automatically becomes an AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Automatic conversion from JSON parsing errors to AppError.
///
/// ## Why BadRequest:
/// JSON parsing errors are almost always due to the client sending malformed data,
/// so they should result in a 400 (Bad Request) response, not a 500 (Internal Server Error).
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

/// Automatic conversion from configuration errors to AppError.
///
/// ## When this happens:
/// - config.toml file has invalid syntax
/// - Required environment variables are missing
/// - Configuration values fail validation
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Automatic conversion from store lookups to AppError.
///
/// ## When this happens:
/// A read-only operation (summary, snapshot) referenced a conversation id
/// that was never created. Maps to 404.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

/// Automatic conversion from transcription failures to AppError.
///
/// The detailed provider error was already logged where it happened; the
/// client sees a generic message.
impl From<TranscriptionError> for AppError {
    fn from(_err: TranscriptionError) -> Self {
        AppError::Transcription("Failed to transcribe audio".to_string())
    }
}

/// Automatic conversion from chat-completion failures to AppError.
///
/// The detailed provider error was already logged where it happened; the
/// client sees a generic message.
impl From<CompletionError> for AppError {
    fn from(_err: CompletionError) -> Self {
        AppError::Completion("Failed to generate a reply".to_string())
    }
}

/// Automatic conversion from orchestrated-turn failures to AppError.
///
/// ## Mapping:
/// - Transcription failure → generic transcription message (no state changed)
/// - Completion failure → generic completion message (the user turn from this
///   call remains in the conversation)
impl From<TurnError> for AppError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Transcription(source) => source.into(),
            TurnError::Completion { source, .. } => source.into(),
        }
    }
}

/// Type alias for Results that use our custom error type.
///
/// ## Usage Example:
/// ```rust
/// fn load_config() -> AppResult<AppConfig> {
///     // This is equivalent to: fn load_config() -> Result<AppConfig, AppError>
///     AppConfig::load()
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_code_mapping() {
        let cases = vec![
            (
                AppError::Internal("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (
                AppError::UploadMissing("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (
                AppError::Transcription("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Completion("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::ValidationError("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.error_response().status(), expected);
        }
    }

    #[test]
    fn test_provider_failures_map_to_generic_messages() {
        let err: AppError =
            crate::transcription::TranscriptionError::Request("socket reset by provider".into())
                .into();
        match err {
            AppError::Transcription(msg) => {
                assert_eq!(msg, "Failed to transcribe audio");
                assert!(!msg.contains("socket"));
            }
            other => panic!("Expected Transcription, got {:?}", other),
        }
    }

    #[test]
    fn test_turn_error_conversion_drops_partial_transcript() {
        let err: AppError = TurnError::Completion {
            transcript: "private utterance".to_string(),
            source: CompletionError::Request("timeout".to_string()),
        }
        .into();
        match err {
            AppError::Completion(msg) => assert!(!msg.contains("private utterance")),
            other => panic!("Expected Completion, got {:?}", other),
        }
    }
}
