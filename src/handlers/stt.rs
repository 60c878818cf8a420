//! Speech-to-text upload endpoint: one audio file in, one orchestrated
//! conversation turn out.

use crate::audio::segment::{AudioSegment, MIME_WEBM};
use crate::conversation::DEFAULT_CONVERSATION_ID;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Serialize;

/// Response body for a successful turn.
#[derive(Debug, Serialize)]
pub struct SttResponse {
    pub transcript: String,
    #[serde(rename = "aiResponse")]
    pub ai_response: String,
}

/// Run one conversation turn from an uploaded audio file.
///
/// ## Endpoint: `POST /api/stt`
///
/// ## Request:
/// Multipart form data with an audio file field named "audio" and an optional
/// text field "chatId". A missing or blank "chatId" selects the shared
/// `"default"` conversation.
///
/// ## Response:
/// ```json
/// {
///   "transcript": "I have a headache",
///   "aiResponse": "How long has it lasted?"
/// }
/// ```
pub async fn speech_to_text(
    state: web::Data<AppState>,
    mut payload: actix_multipart::Multipart,
) -> Result<HttpResponse, AppError> {
    use actix_multipart::Field;
    use futures_util::stream::StreamExt;

    let mut audio_data: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut chat_id: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::ValidationError("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))?
            .to_string();

        if field_name == "audio" {
            filename = content_disposition.get_filename().map(|s| s.to_string());
            mime_type = field.content_type().map(|m| m.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                bytes.extend_from_slice(&chunk);
            }

            audio_data = Some(bytes);
        } else if field_name == "chatId" {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                bytes.extend_from_slice(&chunk);
            }

            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::ValidationError("chatId must be valid UTF-8".to_string()))?;
            chat_id = Some(value);
        }
    }

    let audio_bytes = audio_data
        .ok_or_else(|| AppError::UploadMissing("No audio file uploaded".to_string()))?;

    if audio_bytes.is_empty() {
        return Err(AppError::UploadMissing(
            "Uploaded audio file is empty".to_string(),
        ));
    }

    // The transcription provider rejects uploads above 25MB anyway
    const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;
    if audio_bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::ValidationError(format!(
            "File too large: {} bytes (max: {} bytes)",
            audio_bytes.len(),
            MAX_FILE_SIZE
        )));
    }

    let chat_id = chat_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERSATION_ID.to_string());

    tracing::debug!(
        chat_id = %chat_id,
        size_bytes = audio_bytes.len(),
        filename = %filename.as_deref().unwrap_or("unnamed"),
        "Received audio upload"
    );

    let segment = AudioSegment::new(
        audio_bytes,
        mime_type.unwrap_or_else(|| MIME_WEBM.to_string()),
    );

    let engine = state.current_engine();
    let exchange = engine.handle_turn(&chat_id, segment).await?;

    Ok(HttpResponse::Ok().json(SttResponse {
        transcript: exchange.user_text,
        ai_response: exchange.assistant_text,
    }))
}
