mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::{json, Value};

use symptom_log::models::User;

use common::{call, setup, TestContext, RICE_CAKES};

fn post_request(ctx: &TestContext, user: &User, payload: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/event")
        .insert_header(ctx.auth(user))
        .set_json(payload)
}

fn created_id(status: StatusCode, body: &Value) -> i64 {
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("event id")
}

fn lunch() -> Value {
    json!({ "type": "meal", "name": "lunch", "items": [RICE_CAKES], "time": "2024-04-01T12:00:00Z" })
}

fn headache() -> Value {
    json!({ "type": "symptom", "symptom": "headache", "severity": 3, "time": "2024-04-01T15:00:00Z" })
}

#[actix_web::test]
async fn owner_can_delete_a_meal() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (status, body) = call(&app, post_request(&ctx, &ctx.alice, lunch()).to_request()).await;
    let id = created_id(status, &body);

    let req = test::TestRequest::delete()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.alice))
        .set_json(json!({ "type": "meal", "id": id }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let req = test::TestRequest::get()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.alice))
        .to_request();
    let (_, timeline) = call(&app, req).await;
    assert_eq!(timeline["events"], json!([]));
}

#[actix_web::test]
async fn deleting_someone_elses_meal_is_forbidden() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (status, body) = call(&app, post_request(&ctx, &ctx.alice, lunch()).to_request()).await;
    let id = created_id(status, &body);

    let req = test::TestRequest::delete()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.bob))
        .set_json(json!({ "type": "meal", "id": id }))
        .to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], format!("meal {} does not belong to you", id));

    let req = test::TestRequest::get()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.alice))
        .to_request();
    let (_, timeline) = call(&app, req).await;
    assert_eq!(timeline["events"][0]["id"], id);
}

#[actix_web::test]
async fn symptom_ownership_is_checked_through_its_type() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let (status, body) = call(&app, post_request(&ctx, &ctx.alice, headache()).to_request()).await;
    let id = created_id(status, &body);

    let req = test::TestRequest::delete()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.bob))
        .set_json(json!({ "type": "symptom", "id": id }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.alice))
        .set_json(json!({ "type": "symptom", "id": id }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/event")
        .insert_header(ctx.auth(&ctx.alice))
        .to_request();
    let (_, timeline) = call(&app, req).await;
    assert_eq!(timeline["events"], json!([]));
}

#[actix_web::test]
async fn unknown_ids_are_not_found() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    for (kind, message) in [("meal", "meal 4242 not found"), ("symptom", "symptom 4242 not found")] {
        let req = test::TestRequest::delete()
            .uri("/api/event")
            .insert_header(ctx.auth(&ctx.alice))
            .set_json(json!({ "type": kind, "id": 4242 }))
            .to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], message);
    }
}

#[actix_web::test]
async fn delete_payload_is_validated() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let cases = [
        (json!({ "id": 1 }), "type is required"),
        (json!({ "type": "meal" }), "id is required"),
        (json!({ "type": "meal", "id": "one" }), "id must be an integer"),
        (json!({ "type": "sleep", "id": 1 }), "unsupported event type 'sleep'"),
        (json!({ "type": "", "id": 1 }), "unsupported event type ''"),
        (json!({ "type": "sleep_through_the_night", "id": 1 }), "unsupported event type 'sleep_through_the_night'"),
        (json!({ "type": "sleep" }), "unsupported event type 'sleep'"),
    ];
    for (payload, message) in cases {
        let req = test::TestRequest::delete()
            .uri("/api/event")
            .insert_header(ctx.auth(&ctx.alice))
            .set_json(payload)
            .to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", message);
        assert_eq!(body["error"], message);
    }
}
