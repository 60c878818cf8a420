//! Read and reset endpoints for stored conversations.

use crate::conversation::{summarize, DEFAULT_CONVERSATION_ID};
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Query parameter shared by the conversation endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatIdQuery {
    #[serde(rename = "chatId")]
    pub chat_id: Option<String>,
}

impl ChatIdQuery {
    fn trimmed(&self) -> Option<&str> {
        self.chat_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Render the full transcript of one conversation.
///
/// ## Endpoint: `GET /api/summary?chatId=...`
///
/// ## Response:
/// ```json
/// { "summary": "USER: hello | ASSISTANT: hi there" }
/// ```
///
/// `chatId` is required here (400 when blank); asking for a summary without
/// naming a conversation has no meaningful answer. An id that was never
/// created is a 404.
pub async fn get_summary(
    state: web::Data<AppState>,
    query: web::Query<ChatIdQuery>,
) -> Result<HttpResponse, AppError> {
    let chat_id = query
        .trimmed()
        .ok_or_else(|| AppError::ValidationError("chatId is required".to_string()))?;

    let summary = summarize(&state.store, chat_id)?;

    Ok(HttpResponse::Ok().json(json!({ "summary": summary })))
}

/// Drop one conversation's history.
///
/// ## Endpoint: `DELETE /api/conversation?chatId=...`
///
/// A missing `chatId` clears the shared `"default"` conversation. Clearing an
/// id that never existed still confirms; the `cleared` flag reports whether
/// anything was there.
pub async fn clear_conversation(
    state: web::Data<AppState>,
    query: web::Query<ChatIdQuery>,
) -> Result<HttpResponse, AppError> {
    let chat_id = query.trimmed().unwrap_or(DEFAULT_CONVERSATION_ID);

    let cleared = state.lifecycle.end(chat_id);
    info!(chat_id = %chat_id, cleared, "Cleared conversation history");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Conversation history cleared",
        "chatId": chat_id,
        "cleared": cleared
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::conversation::Role;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    fn seeded_state() -> web::Data<AppState> {
        let state = AppState::new(AppConfig::default());
        state.store.append("c1", Role::User, "hello".to_string());
        state
            .store
            .append("c1", Role::Assistant, "hi there".to_string());
        web::Data::new(state)
    }

    #[actix_web::test]
    async fn test_summary_renders_role_labelled_transcript() {
        let state = seeded_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/summary", web::get().to(get_summary)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/summary?chatId=c1")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["summary"], "USER: hello | ASSISTANT: hi there");
    }

    #[actix_web::test]
    async fn test_summary_requires_chat_id() {
        let state = seeded_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/summary", web::get().to(get_summary)),
        )
        .await;

        for uri in ["/api/summary", "/api/summary?chatId=%20%20"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[actix_web::test]
    async fn test_summary_of_unknown_conversation_is_404() {
        let state = seeded_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/summary", web::get().to(get_summary)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/summary?chatId=unknown")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[actix_web::test]
    async fn test_clear_is_idempotent() {
        let state = seeded_state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/conversation", web::delete().to(clear_conversation)),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri("/api/conversation?chatId=c1")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cleared"], true);
        assert!(state.store.snapshot("c1").is_err());

        let req = test::TestRequest::delete()
            .uri("/api/conversation?chatId=c1")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cleared"], false);
        assert_eq!(body["message"], "Conversation history cleared");
    }

    #[actix_web::test]
    async fn test_clear_without_chat_id_targets_default() {
        let state = web::Data::new(AppState::new(AppConfig::default()));
        state
            .store
            .append(DEFAULT_CONVERSATION_ID, Role::User, "hello".to_string());

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/conversation", web::delete().to(clear_conversation)),
        )
        .await;

        let req = test::TestRequest::delete().uri("/api/conversation").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["chatId"], DEFAULT_CONVERSATION_ID);
        assert_eq!(body["cleared"], true);
        assert!(state.store.is_empty());
    }
}
