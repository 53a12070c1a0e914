//! JSON shapes returned by the event routes. Every user-supplied string is
//! HTML-escaped on the way out.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::models::{MealItem, MealRecord, SymptomRecord, User};

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn utc(created: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&created)
}

#[derive(Debug, Serialize)]
pub struct Timeline {
    pub username: String,
    pub display_name: String,
    pub events: Vec<EventView>,
}

impl Timeline {
    /// Meals first, then symptoms, stable-sorted newest first. Events with
    /// the same time keep that order.
    pub fn new(user: &User, meals: Vec<MealRecord>, symptoms: Vec<SymptomRecord>) -> Self {
        let mut events: Vec<EventView> = meals
            .iter()
            .map(EventView::meal)
            .chain(symptoms.iter().map(|s| EventView::symptom(s, &s.name)))
            .collect();
        events.sort_by(|a, b| b.time().cmp(&a.time()));

        Self {
            username: escape_html(&user.username),
            display_name: escape_html(&user.display_name),
            events,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventView {
    Meal(MealView),
    Symptom(SymptomView),
}

impl EventView {
    pub fn meal(record: &MealRecord) -> Self {
        EventView::Meal(MealView {
            id: record.id,
            name: escape_html(&record.name),
            time: utc(record.created),
            items: record.items.iter().map(ItemView::from).collect(),
        })
    }

    /// `shown` is the symptom name as it should be echoed back; the stored
    /// type name is always lowercase.
    pub fn symptom(record: &SymptomRecord, shown: &str) -> Self {
        let shown = escape_html(shown);
        EventView::Symptom(SymptomView {
            id: record.id,
            symptom: shown.clone(),
            severity_number: record.severity_id,
            severity: escape_html(&record.severity),
            name: shown,
            time: utc(record.created),
        })
    }

    pub fn time(&self) -> DateTime<Utc> {
        match self {
            EventView::Meal(meal) => meal.time,
            EventView::Symptom(symptom) => symptom.time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealView {
    pub id: i32,
    pub name: String,
    pub time: DateTime<Utc>,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub name: String,
    pub ndbno: i64,
    pub quantity: i32,
    pub ingredients: Vec<String>,
}

impl From<&MealItem> for ItemView {
    fn from(item: &MealItem) -> Self {
        Self {
            name: escape_html(&item.name),
            ndbno: item.ndbno,
            quantity: item.quantity,
            ingredients: item.ingredients.iter().map(|i| escape_html(i)).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomView {
    pub id: i32,
    pub symptom: String,
    pub severity_number: i32,
    pub severity: String,
    pub name: String,
    pub time: DateTime<Utc>,
}
