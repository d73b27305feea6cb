use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Effective configuration after all layers were applied.
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": serde_json::to_value(&config)?,
        "speech_engine": {
            "name": state.recognizer.engine_name(),
            "available": state.recognizer.is_available()
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_get_config() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/api/v1/config", web::get().to(get_config)),
        )
        .await;

        let body: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/config").to_request(),
        )
        .await;

        assert_eq!(body["config"]["server"]["port"], 8000);
        assert_eq!(body["config"]["speech"]["frame_samples"], 4000);
        assert_eq!(body["speech_engine"]["available"], false);
    }
}
