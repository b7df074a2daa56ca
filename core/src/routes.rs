use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{
    error::{AppError, Res},
    events::InboundEvent,
    http::Success,
};

use crate::dispatch::Dispatcher;

/// Accepts one event from the chat gateway and answers with the commands
/// the gateway must execute for it.
#[post("/events")]
pub async fn post_event(
    dispatcher: web::Data<Arc<Dispatcher>>,
    event: web::Json<InboundEvent>,
) -> Res<impl Responder> {
    let commands = dispatcher.dispatch(&event).await;
    Success::commands(commands)
}

#[get("/health")]
pub async fn get_health() -> Res<impl Responder> {
    Success::ok(serde_json::json!({ "status": "ok" }))
}

/// Malformed events are answered in the same error shape as everything else.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _| AppError::BadRequest(err.to_string()).into())
}

pub fn mount_api() -> actix_web::Scope {
    web::scope("/api")
        .app_data(json_config())
        .service(post_event)
        .service(get_health)
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};
    use admin::AdminService;
    use common::env_config::{AdminConfig, PricingConfig, PromptConfig};
    use intake::IntakeService;
    use serde_json::{Value, json};

    use super::*;

    async fn dispatcher() -> Arc<Dispatcher> {
        let pool = db::setup_in_memory().await.unwrap();
        Arc::new(Dispatcher::new(
            AdminService::new(
                pool.clone(),
                &AdminConfig {
                    password: "pw".into(),
                    ids: vec![],
                },
            ),
            IntakeService::new(
                pool,
                PricingConfig {
                    activation_price: 0,
                    activation_price_ton: None,
                    payment_phone: String::new(),
                },
                PromptConfig::default(),
            ),
        ))
    }

    #[actix_web::test]
    async fn event_round_trip() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(dispatcher().await))
                .service(mount_api()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(json!({ "kind": "button", "user_id": 5, "action_id": "buy" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["commands"][0]["kind"], "send_text");
        assert_eq!(body["commands"][0]["user_id"], 5);

        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(json!({ "kind": "text", "user_id": 5, "text": "+79991234567" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["commands"][0]["text"], "Теперь введите ваше имя:");
    }

    #[actix_web::test]
    async fn malformed_events_are_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(dispatcher().await))
                .service(mount_api()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(json!({ "kind": "telepathy", "user_id": 5 }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn health() {
        let app = test::init_service(App::new().service(mount_api())).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }
}
