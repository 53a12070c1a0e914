use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::error::ApiError;

mod event;
mod food;

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Registers every route, and makes malformed JSON bodies answer with the
/// same `{"error": ...}` shape as the handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Validation(format!("invalid JSON body: {}", err)).into()
    }))
    .service(health)
    .service(event::post_event)
    .service(event::get_events)
    .service(event::delete_event)
    .service(food::search_food)
    .service(food::import_food);
}
