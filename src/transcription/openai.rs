//! # OpenAI Transcription Client
//!
//! `SpeechToText` implementation backed by the OpenAI audio transcriptions API
//! (Whisper). Segments are uploaded as multipart form data with the model name;
//! the provider answers with a plain `{ "text": ... }` body.

use crate::audio::segment::AudioSegment;
use crate::transcription::gateway::{SpeechToText, TranscriptionError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Default API root; joined with the transcriptions path per request.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Speech-to-text client for the OpenAI transcriptions endpoint.
#[derive(Clone)]
pub struct OpenAiTranscriber {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiTranscriber {
    /// Create a client with the provided API key and model (e.g. `whisper-1`).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: model.into(),
        }
    }

    /// Override the API base URL (self-hosted gateways, test doubles).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.api_base)
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(&self, segment: &AudioSegment) -> Result<String, TranscriptionError> {
        let part = Part::bytes(segment.bytes.clone())
            .file_name(segment.upload_filename())
            .mime_str(&segment.mime_type)
            .map_err(|err| {
                TranscriptionError::Request(format!(
                    "Invalid segment mime type '{}': {}",
                    segment.mime_type, err
                ))
            })?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        debug!(
            bytes = segment.len(),
            mime_type = %segment.mime_type,
            model = %self.model,
            "Uploading segment for transcription"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|err| TranscriptionError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read provider error body".to_string());
            return Err(provider_error(status, body));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|err| TranscriptionError::InvalidResponse(err.to_string()))?;

        text_from_response(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Deserialize)]
struct ProviderErrorResponse {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Pull the transcript out of a provider response, treating a blank transcript
/// as a failure (empty or garbled input audio).
fn text_from_response(response: TranscriptionResponse) -> Result<String, TranscriptionError> {
    let text = response.text.trim().to_string();
    if text.is_empty() {
        return Err(TranscriptionError::InvalidResponse(
            "Provider returned an empty transcript".to_string(),
        ));
    }
    Ok(text)
}

fn provider_error(status: StatusCode, body: String) -> TranscriptionError {
    let message = serde_json::from_str::<ProviderErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    TranscriptionError::Provider {
        status: status.as_u16(),
        message,
    }
}
