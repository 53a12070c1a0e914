use actix_web::{get, post, web, HttpResponse};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::cache::SearchCache;
use crate::error::ApiError;
use crate::food_api::FoodApi;
use crate::store::EventStore;
use crate::validate;

#[derive(Debug, Deserialize)]
struct SearchParams {
    search: Option<String>,
    brand: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImportPayload {
    ndbno: i64,
}

#[get("/api/food/search")]
async fn search_food(
    _user: AuthUser,
    params: web::Query<SearchParams>,
    food_api: web::Data<FoodApi>,
    search_cache: web::Data<SearchCache>,
) -> Result<HttpResponse, ApiError> {
    let SearchParams { search, brand } = params.into_inner();
    let term = search
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .ok_or_else(|| ApiError::Validation("search query parameter is required".to_string()))?;
    let brand = brand
        .map(|brand| brand.trim().to_string())
        .filter(|brand| !brand.is_empty());

    let key = SearchCache::key(&term, brand.as_deref());
    let cache = search_cache.clone();
    let lookup_key = key.clone();
    if let Some(page) = web::block(move || cache.get(&lookup_key)).await? {
        debug!("search cache hit for {}", key);
        return Ok(HttpResponse::Ok().json(page));
    }

    let page = food_api.search(&term, brand.as_deref()).await?;
    let cached = page.clone();
    web::block(move || search_cache.put(&key, &cached)).await?;

    Ok(HttpResponse::Ok().json(page))
}

#[post("/api/food")]
async fn import_food(
    _user: AuthUser,
    store: web::Data<dyn EventStore>,
    food_api: web::Data<FoodApi>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let body = validate::object(body.into_inner())?;
    validate::check(&body, validate::FOOD_IMPORT_FIELDS)?;
    let ImportPayload { ndbno } = validate::parse(body)?;

    let known = store.clone();
    if web::block(move || known.food_exists(ndbno)).await?? {
        debug!("food {} already imported", ndbno);
        return Ok(HttpResponse::NoContent().finish());
    }

    let food = food_api
        .food(ndbno)
        .await?
        .ok_or_else(|| ApiError::Validation(format!("food {} does not exist", ndbno)))?;
    let ingredient_count = food.ingredients.len();
    web::block(move || store.save_food(&food)).await??;

    info!("imported food {} with {} ingredients", ndbno, ingredient_count);
    Ok(HttpResponse::NoContent().finish())
}
