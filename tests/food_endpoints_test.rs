mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::json;

use common::{call, setup, RICE_CAKES};

#[actix_web::test]
async fn search_requires_a_term() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    for uri in ["/api/food/search", "/api/food/search?search=", "/api/food/search?search=%20&brand=lays"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(ctx.auth(&ctx.alice))
            .to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "search query parameter is required");
    }
}

#[actix_web::test]
async fn food_routes_require_a_token() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let req = test::TestRequest::get()
        .uri("/api/food/search?search=ramen")
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/food")
        .set_json(json!({ "ndbno": RICE_CAKES }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn import_requires_an_integer_ndbno() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let cases = [
        (json!({}), "ndbno is required"),
        (json!({ "ndbno": "363898" }), "ndbno must be an integer"),
    ];
    for (payload, message) in cases {
        let req = test::TestRequest::post()
            .uri("/api/food")
            .insert_header(ctx.auth(&ctx.alice))
            .set_json(payload)
            .to_request();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], message);
    }
}

#[actix_web::test]
async fn importing_a_known_food_is_a_no_op() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/food")
        .insert_header(ctx.auth(&ctx.alice))
        .set_json(json!({ "ndbno": RICE_CAKES }))
        .to_request();
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn health_needs_no_token() {
    let ctx = setup();
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
