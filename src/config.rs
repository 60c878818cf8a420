//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **struct**: Custom data types that group related fields together
//! - **impl blocks**: Add methods to structs
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, OPENAI_API_KEY, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result; // Better error handling with context
use serde::{Deserialize, Serialize}; // For converting to/from TOML, JSON, etc.
use std::env; // For reading environment variables

use crate::audio::wav::PcmFormat;

/// Main application configuration that contains all settings.
///
/// ## Rust Concepts:
/// - **#[derive(...)]**: Automatically implements common traits:
///   - `Debug`: Allows printing with {:?} for debugging
///   - `Clone`: Allows making copies of the struct
///   - `Serialize`: Can convert this struct to JSON, TOML, etc.
///   - `Deserialize`: Can create this struct from JSON, TOML, etc.
/// - **pub struct**: Public struct that other modules can use
/// - **pub fields**: Public fields that can be accessed directly
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, openai, audio)
/// makes it easier to understand and maintain as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub audio: AudioConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to (e.g., "127.0.0.1", "0.0.0.0")
/// - `port`: TCP port number to listen on (1-65535)
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16, // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// OpenAI provider configuration.
///
/// ## Fields:
/// - `api_key`: Secret key for the OpenAI API (set via the OPENAI_API_KEY environment variable)
/// - `api_base`: Base URL of the API, overridable to point at a compatible gateway
/// - `transcription_model`: Speech-to-text model (e.g., "whisper-1")
/// - `chat_model`: Chat-completion model (e.g., "gpt-4o-mini")
/// - `system_prompt`: Instruction that opens every completion prompt
///
/// ## Secret handling:
/// The key is never written to logs or returned by the configuration
/// endpoints; see the config handler for the redaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub transcription_model: String,
    pub chat_model: String,
    pub system_prompt: String,
}

/// Audio capture configuration for the streaming endpoint.
///
/// ## Fields:
/// - `sample_rate`: PCM samples per second expected from streaming clients
/// - `channels`: Number of interleaved channels (1 = mono)
/// - `bit_depth`: Bits per sample (16 = signed 16-bit little-endian)
/// - `min_segment_bytes`: Segments smaller than this are dropped (0 keeps everything)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub min_segment_bytes: usize,
}

impl AudioConfig {
    /// The PCM format streaming clients are expected to send.
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: self.bit_depth,
        }
    }
}

/// Provides default configuration values.
///
/// ## Rust Concepts:
/// - **impl Default**: Implements the Default trait, which provides a `default()` method
/// - **Self**: Refers to the current type (AppConfig)
/// - **to_string()**: Converts string literals (&str) to owned String objects
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(), // Localhost only (safe for development)
                port: 8000,
            },
            openai: OpenAiConfig {
                api_key: String::new(), // Must come from the environment
                api_base: "https://api.openai.com/v1".to_string(),
                transcription_model: "whisper-1".to_string(),
                chat_model: "gpt-4o-mini".to_string(),
                system_prompt:
                    "You are a medical assistant that provides concise answers for medical questions."
                        .to_string(),
            },
            audio: AudioConfig {
                sample_rate: 16000, // Standard speech-recognition rate
                channels: 1,
                bit_depth: 16,
                min_segment_bytes: 0,
            },
        }
    }
}

/// Implementation block for AppConfig - adds methods to the struct.
impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST, PORT, and OPENAI_API_KEY
    ///
    /// ## Rust Concepts:
    /// - **Builder pattern**: Chain method calls to configure the config loader
    /// - **?**: Early return on error (if any step fails, return the error)
    /// - **env::var()**: Read environment variables, returns Result<String, VarError>
    /// - **if let Ok(...)**: Only execute if the environment variable exists
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `HOST=0.0.0.0`: Special case for deployment platforms
    /// - `PORT=3000`: Special case for deployment platforms
    /// - `OPENAI_API_KEY=sk-...`: Standard variable name used by provider SDKs
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists) - required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_SERVER_HOST becomes server.host in the config
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Handle special environment variables used by deployment platforms
        // These don't follow the APP_ prefix convention but are commonly used
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        // The provider SDK convention everyone already exports
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("openai.api_key", key)?;
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be used)
    /// - Model names and the system prompt are not blank
    /// - The PCM format describes a decodable stream
    ///
    /// The API key is intentionally not required here: read-only endpoints
    /// work without it, and provider calls fail with a clear error when the
    /// key is missing. Startup logs a warning instead.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.openai.transcription_model.trim().is_empty() {
            return Err(anyhow::anyhow!("Transcription model cannot be blank"));
        }

        if self.openai.chat_model.trim().is_empty() {
            return Err(anyhow::anyhow!("Chat model cannot be blank"));
        }

        if self.openai.system_prompt.trim().is_empty() {
            return Err(anyhow::anyhow!("System prompt cannot be blank"));
        }

        if self.audio.sample_rate == 0 {
            return Err(anyhow::anyhow!("Audio sample rate must be greater than 0"));
        }

        if self.audio.channels == 0 {
            return Err(anyhow::anyhow!("Audio channel count must be greater than 0"));
        }

        if self.audio.bit_depth == 0 || self.audio.bit_depth % 8 != 0 {
            return Err(anyhow::anyhow!("Audio bit depth must be a positive multiple of 8"));
        }

        Ok(()) // All validation passed
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## What this does:
    /// 1. Parse the JSON string into a generic value
    /// 2. Extract individual configuration fields if they exist
    /// 3. Update only the fields that were provided
    /// 4. Validate the updated configuration
    ///
    /// ## Partial updates:
    /// This method allows updating only some fields, not the entire configuration.
    /// For example, you can send just `{"openai": {"chat_model": "gpt-4o"}}` to
    /// switch models without touching anything else.
    ///
    /// Server host and port are not updatable here: the listener is already
    /// bound by the time this runs.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        // Parse the JSON string into a generic value
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        // Update provider configuration if provided
        if let Some(openai) = partial_config.get("openai") {
            if let Some(key) = openai.get("api_key").and_then(|v| v.as_str()) {
                self.openai.api_key = key.to_string();
            }
            if let Some(base) = openai.get("api_base").and_then(|v| v.as_str()) {
                self.openai.api_base = base.to_string();
            }
            if let Some(model) = openai.get("transcription_model").and_then(|v| v.as_str()) {
                self.openai.transcription_model = model.to_string();
            }
            if let Some(model) = openai.get("chat_model").and_then(|v| v.as_str()) {
                self.openai.chat_model = model.to_string();
            }
            if let Some(prompt) = openai.get("system_prompt").and_then(|v| v.as_str()) {
                self.openai.system_prompt = prompt.to_string();
            }
        }

        // Update audio configuration if provided
        if let Some(audio) = partial_config.get("audio") {
            if let Some(rate) = audio.get("sample_rate").and_then(|v| v.as_u64()) {
                self.audio.sample_rate = rate as u32;
            }
            if let Some(channels) = audio.get("channels").and_then(|v| v.as_u64()) {
                self.audio.channels = channels as u8;
            }
            if let Some(depth) = audio.get("bit_depth").and_then(|v| v.as_u64()) {
                self.audio.bit_depth = depth as u8;
            }
            if let Some(min) = audio.get("min_segment_bytes").and_then(|v| v.as_u64()) {
                self.audio.min_segment_bytes = min as usize;
            }
        }

        // Validate the updated configuration to ensure it's still valid
        self.validate()?;
        Ok(())
    }
}

/// Tests for the configuration module.
///
/// ## Rust Concepts:
/// - **#[cfg(test)]**: Only compile this code when running tests
/// - **mod tests**: A module containing test functions
/// - **#[test]**: Marks a function as a test case
/// - **assert_eq!**: Checks that two values are equal
/// - **is_ok(), is_err()**: Check if a Result is success or error
#[cfg(test)]
mod tests {
    use super::*; // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.openai.transcription_model, "whisper-1");
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0; // Invalid port
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.openai.system_prompt = "   ".to_string(); // Blank prompt
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.bit_depth = 12; // Not a whole number of bytes
        assert!(config.validate().is_err());
    }

    /// Test that runtime configuration updates work correctly.
    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"openai": {"chat_model": "gpt-4o"}}"#; // Update only the model
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.openai.chat_model, "gpt-4o");
        // Other fields should remain unchanged
        assert_eq!(config.openai.transcription_model, "whisper-1");
        assert_eq!(config.server.port, 8000);
    }

    /// Test that an update which breaks validation is rejected.
    #[test]
    fn test_config_update_rejects_invalid_values() {
        let mut config = AppConfig::default();
        let json = r#"{"audio": {"sample_rate": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }

    #[test]
    fn test_pcm_format_mirrors_audio_section() {
        let config = AppConfig::default();
        let format = config.audio.pcm_format();
        assert_eq!(format.sample_rate, 16000);
        assert_eq!(format.channels, 1);
        assert_eq!(format.bit_depth, 16);
    }
}
