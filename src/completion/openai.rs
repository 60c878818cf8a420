//! # OpenAI Chat-Completion Client
//!
//! `ChatCompletion` implementation against the OpenAI chat completions API.
//! One request per turn: the full prompt goes up, the first choice's message
//! content comes back.

use crate::completion::gateway::{ChatCompletion, ChatMessage, CompletionError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API root; joined with the chat completions path per request.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat client for the OpenAI completions endpoint.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiChatClient {
    /// Create a client with the provided API key and model (e.g. `gpt-4o-mini`).
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
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
        };

        debug!(
            model = %self.model,
            prompt_messages = messages.len(),
            "Requesting chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| CompletionError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read provider error body".to_string());
            return Err(provider_error(status, body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::InvalidResponse(err.to_string()))?;

        extract_reply(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorResponse {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Pull the reply text out of the first choice, rejecting responses with no
/// choices or null content.
fn extract_reply(response: ChatCompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            CompletionError::InvalidResponse(
                "Provider returned no content in the response".to_string(),
            )
        })
}

fn provider_error(status: StatusCode, body: String) -> CompletionError {
    let message = serde_json::from_str::<ProviderErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    CompletionError::Provider {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_model_and_messages() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage::system("You are a medical assistant."),
                ChatMessage::user("hello"),
            ],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "You are a medical assistant.");
        assert_eq!(value["messages"][1]["role"], "user");
    }

    #[test]
    fn test_extract_reply_takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}},{"message":{"content":"ignored"}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_reply(response).unwrap(), "hi there");
    }

    #[test]
    fn test_extract_reply_rejects_empty_choices() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(CompletionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_extract_reply_rejects_null_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(CompletionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_provider_error_extracts_message() {
        let body = r#"{"error":{"message":"Rate limit reached.","type":"tokens"}}"#;
        match provider_error(StatusCode::TOO_MANY_REQUESTS, body.to_string()) {
            CompletionError::Provider { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached.");
            }
            other => panic!("Expected Provider error, got {:?}", other),
        }
    }
}
