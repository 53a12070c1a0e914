use std::io;
use std::sync::Arc;

use actix_web::{middleware, App, HttpServer};

use symptom_log::auth::JwtKeys;
use symptom_log::cache::SearchCache;
use symptom_log::config::Config;
use symptom_log::food_api::FoodApi;
use symptom_log::store::MysqlStore;
use symptom_log::AppState;

fn startup_error<E: std::fmt::Display>(context: &str, err: E) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    // set up database connection pool
    let store = MysqlStore::connect(&config.database_url, config.run_migrations)
        .map_err(|e| startup_error("failed to open database", e))?;
    let keys = JwtKeys::new(&config.jwt_secret).map_err(|e| startup_error("invalid JWT_SECRET", e))?;
    let food_api = FoodApi::new(&config.fdc_base_url, &config.fdc_api_key)
        .map_err(|e| startup_error("failed to build food database client", e))?;
    let search_cache = SearchCache::connect(config.redis_url.as_deref(), config.search_cache_seconds);

    let state = AppState::new(Arc::new(store), keys, food_api, search_cache);

    log::info!("starting HTTP server at http://{}:{}", config.host, config.port);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
