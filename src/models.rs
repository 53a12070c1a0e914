use chrono::NaiveDateTime;

use crate::schema::{food, ingredients, meals, plates, symptom_types, symptoms};

#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct Meal {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "meals"]
pub(crate) struct NewMealRow<'a> {
    pub user_id: i32,
    pub name: &'a str,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "plates"]
pub(crate) struct NewPlateRow {
    pub meal_id: i32,
    pub ndbno: i64,
    pub quantity: i32,
}

#[derive(Insertable)]
#[table_name = "symptom_types"]
pub(crate) struct NewSymptomTypeRow<'a> {
    pub user_id: i32,
    pub name: &'a str,
}

#[derive(Insertable)]
#[table_name = "symptoms"]
pub(crate) struct NewSymptomRow {
    pub type_id: i32,
    pub severity_id: i32,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "food"]
pub(crate) struct NewFoodRow<'a> {
    pub ndbno: i64,
    pub name: &'a str,
}

#[derive(Insertable)]
#[table_name = "ingredients"]
pub(crate) struct NewIngredientRow<'a> {
    pub food: i64,
    pub name: &'a str,
}

/// A symptom as posted by a user. `name` keeps the caller's casing; the
/// store lowercases it when resolving the symptom type.
#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub name: String,
    pub severity_id: i32,
    pub created: NaiveDateTime,
}

impl NewSymptom {
    /// Key under which the symptom type is stored for its user.
    pub fn type_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub name: String,
    pub created: NaiveDateTime,
    pub items: Vec<PlateItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateItem {
    pub ndbno: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomRecord {
    pub id: i32,
    pub name: String,
    pub severity_id: i32,
    pub severity: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealRecord {
    pub id: i32,
    pub name: String,
    pub created: NaiveDateTime,
    pub items: Vec<MealItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealItem {
    pub ndbno: i64,
    pub name: String,
    pub quantity: i32,
    pub ingredients: Vec<String>,
}

// imported from the food database, keyed by its ndbno
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodRecord {
    pub ndbno: i64,
    pub name: String,
    pub ingredients: Vec<String>,
}
