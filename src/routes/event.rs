use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{NewMeal, NewSymptom, PlateItem};
use crate::store::EventStore;
use crate::validate::{self, EventKind};
use crate::views::{EventView, Timeline};

#[derive(Debug, Deserialize)]
struct SymptomPayload {
    symptom: String,
    severity: i32,
    time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MealPayload {
    name: String,
    items: Vec<ItemPayload>,
    time: Option<DateTime<Utc>>,
}

/// A meal item is either a bare ndbno or `{ndbno, quantity}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemPayload {
    Ndbno(i64),
    Plate { ndbno: i64, quantity: Option<i32> },
}

impl ItemPayload {
    fn into_plate(self) -> Result<PlateItem, ApiError> {
        let (ndbno, quantity) = match self {
            ItemPayload::Ndbno(ndbno) => (ndbno, 1),
            ItemPayload::Plate { ndbno, quantity } => (ndbno, quantity.unwrap_or(1)),
        };
        if quantity < 1 {
            return Err(ApiError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }
        Ok(PlateItem { ndbno, quantity })
    }
}

#[derive(Debug, Deserialize)]
struct DeletePayload {
    #[serde(rename = "type")]
    kind: String,
    id: i32,
}

// client clocks are trusted when they send a time, otherwise the event
// happened now
fn event_time(time: Option<DateTime<Utc>>) -> NaiveDateTime {
    time.unwrap_or_else(|| {
        debug!("event posted without time, using server time");
        Utc::now()
    })
    .naive_utc()
}

#[post("/api/event")]
async fn post_event(
    user: AuthUser,
    store: web::Data<dyn EventStore>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let body = validate::object(body.into_inner())?;
    let user_id = user.id();

    match validate::event_kind(&body)? {
        EventKind::Symptom => {
            validate::check(&body, validate::SYMPTOM_FIELDS)?;
            let payload: SymptomPayload = validate::parse(body)?;
            let shown = payload.symptom.trim().to_string();
            let symptom = NewSymptom {
                name: shown.clone(),
                severity_id: payload.severity,
                created: event_time(payload.time),
            };

            let record = web::block(move || store.record_symptom(user_id, &symptom)).await??;
            info!("user {} recorded symptom {} ({})", user_id, record.id, record.name);
            Ok(HttpResponse::Created().json(EventView::symptom(&record, &shown)))
        }
        EventKind::Meal => {
            validate::check(&body, validate::MEAL_FIELDS)?;
            let payload: MealPayload = validate::parse(body)?;
            let items = payload
                .items
                .into_iter()
                .map(ItemPayload::into_plate)
                .collect::<Result<Vec<_>, _>>()?;
            let meal = NewMeal {
                name: payload.name.trim().to_string(),
                created: event_time(payload.time),
                items,
            };

            let record = web::block(move || store.record_meal(user_id, &meal)).await??;
            info!(
                "user {} recorded meal {} with {} items",
                user_id,
                record.id,
                record.items.len()
            );
            Ok(HttpResponse::Created().json(EventView::meal(&record)))
        }
    }
}

#[get("/api/event")]
async fn get_events(
    user: AuthUser,
    store: web::Data<dyn EventStore>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.id();
    let (meals, symptoms) = web::block(move || {
        let meals = store.meals_for_user(user_id)?;
        let symptoms = store.symptoms_for_user(user_id)?;
        Ok::<_, crate::store::StoreError>((meals, symptoms))
    })
    .await??;

    Ok(HttpResponse::Ok().json(Timeline::new(&user.0, meals, symptoms)))
}

#[delete("/api/event")]
async fn delete_event(
    user: AuthUser,
    store: web::Data<dyn EventStore>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let body = validate::object(body.into_inner())?;
    let kind = validate::event_kind(&body)?;
    validate::check(&body, validate::DELETE_FIELDS)?;
    let payload: DeletePayload = validate::parse(body)?;
    let user_id = user.id();
    let event_id = payload.id;

    web::block(move || match kind {
        EventKind::Meal => remove_meal(store.get_ref(), user_id, event_id),
        EventKind::Symptom => remove_symptom(store.get_ref(), user_id, event_id),
    })
    .await??;

    info!("user {} deleted {} {}", user_id, payload.kind, event_id);
    Ok(HttpResponse::NoContent().finish())
}

fn remove_meal(store: &dyn EventStore, user_id: i32, meal_id: i32) -> Result<(), ApiError> {
    let meal = store
        .find_meal(meal_id)?
        .ok_or_else(|| ApiError::NotFound(format!("meal {} not found", meal_id)))?;
    if meal.user_id != user_id {
        return Err(ApiError::Forbidden(format!(
            "meal {} does not belong to you",
            meal_id
        )));
    }
    store.delete_meal(meal_id)?;
    Ok(())
}

fn remove_symptom(store: &dyn EventStore, user_id: i32, symptom_id: i32) -> Result<(), ApiError> {
    let owner = store
        .symptom_owner(symptom_id)?
        .ok_or_else(|| ApiError::NotFound(format!("symptom {} not found", symptom_id)))?;
    if owner != user_id {
        return Err(ApiError::Forbidden(format!(
            "symptom {} does not belong to you",
            symptom_id
        )));
    }
    store.delete_symptom(symptom_id)?;
    Ok(())
}
