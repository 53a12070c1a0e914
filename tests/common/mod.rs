#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::Value;

use symptom_log::auth::JwtKeys;
use symptom_log::cache::SearchCache;
use symptom_log::food_api::FoodApi;
use symptom_log::models::{FoodRecord, User};
use symptom_log::store::{EventStore, MemoryStore};
use symptom_log::AppState;

pub const RICE_CAKES: i64 = 363898;
pub const WATER: i64 = 100;
pub const FOOD_API_KEY: &str = "test-key";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub keys: JwtKeys,
    pub alice: User,
    pub bob: User,
}

pub fn setup() -> TestContext {
    // nothing listens here; food tests that need upstream use `setup_with_food_api`
    setup_with_food_api("http://127.0.0.1:9")
}

pub fn setup_with_food_api(food_api_url: &str) -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let alice = store.add_user("alice", "Alice");
    let bob = store.add_user("bob", "Bob");
    store
        .save_food(&FoodRecord {
            ndbno: RICE_CAKES,
            name: "RICE CAKES".to_string(),
            ingredients: vec![
                "ORGANIC BROWN RICE FLOUR".to_string(),
                "ORGANIC WHITE RICE FLOUR".to_string(),
                "BAMBOO EXTRACT".to_string(),
            ],
        })
        .expect("seed food");
    store
        .save_food(&FoodRecord {
            ndbno: WATER,
            name: "WATER".to_string(),
            ingredients: Vec::new(),
        })
        .expect("seed food");

    let keys = JwtKeys::new("integration-secret").expect("keys");
    let food_api = FoodApi::new(food_api_url, FOOD_API_KEY).expect("food api client");
    let state = AppState::new(store.clone(), keys.clone(), food_api, SearchCache::disabled());

    TestContext {
        store,
        state,
        keys,
        alice,
        bob,
    }
}

impl TestContext {
    pub fn auth(&self, user: &User) -> (header::HeaderName, String) {
        let token = self.keys.sign(&user.username, None).expect("token");
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }
}

/// Runs the request and returns the status with the JSON body, or
/// `Value::Null` when the response has no body.
pub async fn call<S, R, B>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    if body.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&body).expect("json body"))
}
