//! Symptom and meal tracking service.
//!
//! Authenticated users post meals (built from foods imported out of USDA
//! FoodData Central) and symptoms with a severity, and read both back as one
//! timeline, newest first.

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

use std::sync::Arc;

use actix_web::web;
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::StateMachine;

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod food_api;
pub mod models;
mod query;
pub mod routes;
mod schema;
pub mod store;
pub mod validate;
pub mod views;

use auth::JwtKeys;
use cache::SearchCache;
use food_api::FoodApi;
use store::EventStore;

pub type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

pub fn circuit_breaker() -> CircuitBreakerType {
    failsafe::Config::new().build()
}

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    store: web::Data<dyn EventStore>,
    keys: web::Data<JwtKeys>,
    food_api: web::Data<FoodApi>,
    search_cache: web::Data<SearchCache>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        keys: JwtKeys,
        food_api: FoodApi,
        search_cache: SearchCache,
    ) -> Self {
        Self {
            store: web::Data::from(store),
            keys: web::Data::new(keys),
            food_api: web::Data::new(food_api),
            search_cache: web::Data::new(search_cache),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.store.clone())
            .app_data(self.keys.clone())
            .app_data(self.food_api.clone())
            .app_data(self.search_cache.clone());
        routes::configure(cfg);
    }
}
