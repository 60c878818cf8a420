use crate::{config::AppConfig, error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

fn masked_key(key: &str) -> &'static str {
    if key.is_empty() {
        ""
    } else {
        "[redacted]"
    }
}

fn config_body(config: &AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "openai": {
            "api_key": masked_key(&config.openai.api_key),
            "api_base": config.openai.api_base,
            "transcription_model": config.openai.transcription_model,
            "chat_model": config.openai.chat_model,
            "system_prompt": config.openai.system_prompt
        },
        "audio": {
            "sample_rate": config.audio.sample_rate,
            "channels": config.audio.channels,
            "bit_depth": config.audio.bit_depth,
            "min_segment_bytes": config.audio.min_segment_bytes
        }
    })
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_body(&config)
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_body(&current_config)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    fn state_with_key() -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.openai.api_key = "sk-secret-value".to_string();
        web::Data::new(AppState::new(config))
    }

    #[actix_web::test]
    async fn test_get_config_redacts_api_key() {
        let state = state_with_key();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/config", web::get().to(get_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["config"]["openai"]["api_key"], "[redacted]");
        assert_eq!(body["config"]["openai"]["chat_model"], "gpt-4o-mini");
        assert!(!body.to_string().contains("sk-secret-value"));
    }

    #[actix_web::test]
    async fn test_update_config_applies_partial_change() {
        let state = state_with_key();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/config")
            .set_json(json!({ "openai": { "chat_model": "gpt-4o" } }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["updated_config"]["openai"]["chat_model"], "gpt-4o");
        assert_eq!(state.get_config().openai.chat_model, "gpt-4o");
        // The untouched secret survives the update.
        assert_eq!(state.get_config().openai.api_key, "sk-secret-value");
    }

    #[actix_web::test]
    async fn test_update_config_rejects_invalid_values() {
        let state = state_with_key();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .route("/api/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/config")
            .set_json(json!({ "audio": { "sample_rate": 0 } }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        // The stored configuration keeps its previous value.
        assert_eq!(state.get_config().audio.sample_rate, 16000);
    }
}
