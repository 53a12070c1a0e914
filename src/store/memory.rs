use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{EventStore, StoreError, StoreResult};
use crate::models::{
    FoodRecord, Meal, MealItem, MealRecord, NewMeal, NewSymptom, PlateItem, SymptomRecord, User,
};

const SEVERITIES: [(i32, &str); 5] = [
    (1, "minimal"),
    (2, "mild"),
    (3, "moderate"),
    (4, "severe"),
    (5, "extreme"),
];

struct SymptomTypeRow {
    id: i32,
    user_id: i32,
    name: String,
}

struct SymptomRow {
    id: i32,
    type_id: i32,
    severity_id: i32,
    created: chrono::NaiveDateTime,
}

struct PlateRow {
    meal_id: i32,
    item: PlateItem,
}

#[derive(Default)]
struct Tables {
    last_id: i32,
    users: Vec<User>,
    severities: BTreeMap<i32, String>,
    symptom_types: Vec<SymptomTypeRow>,
    symptoms: Vec<SymptomRow>,
    meals: Vec<Meal>,
    plates: Vec<PlateRow>,
    foods: BTreeMap<i64, FoodRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn items_of(&self, meal_id: i32) -> Vec<MealItem> {
        self.plates
            .iter()
            .filter(|plate| plate.meal_id == meal_id)
            .filter_map(|plate| {
                self.foods.get(&plate.item.ndbno).map(|food| MealItem {
                    ndbno: food.ndbno,
                    name: food.name.clone(),
                    quantity: plate.item.quantity,
                    ingredients: food.ingredients.clone(),
                })
            })
            .collect()
    }

    fn record_of(&self, meal: &Meal) -> MealRecord {
        MealRecord {
            id: meal.id,
            name: meal.name.clone(),
            created: meal.created,
            items: self.items_of(meal.id),
        }
    }
}

/// [`EventStore`] kept in process memory, seeded with the standard
/// severities. Each call holds one lock for its whole duration, which makes
/// multi-row writes atomic.
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let tables = Tables {
            severities: SEVERITIES
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, username: &str, display_name: &str) -> User {
        let mut tables = self.tables();
        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            display_name: display_name.to_string(),
        };
        tables.users.push(user.clone());
        user
    }

    /// Names of the symptom types the user has recorded so far.
    pub fn symptom_types(&self, user_id: i32) -> Vec<String> {
        self.tables()
            .symptom_types
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.name.clone())
            .collect()
    }
}

impl EventStore for MemoryStore {
    fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    fn record_symptom(&self, user_id: i32, symptom: &NewSymptom) -> StoreResult<SymptomRecord> {
        let mut tables = self.tables();
        let severity = tables
            .severities
            .get(&symptom.severity_id)
            .cloned()
            .ok_or(StoreError::UnknownSeverity(symptom.severity_id))?;

        let type_name = symptom.type_name();
        let existing = tables
            .symptom_types
            .iter()
            .find(|row| row.user_id == user_id && row.name == type_name)
            .map(|row| row.id);
        let type_id = match existing {
            Some(id) => id,
            None => {
                let id = tables.next_id();
                tables.symptom_types.push(SymptomTypeRow {
                    id,
                    user_id,
                    name: type_name.clone(),
                });
                id
            }
        };

        let id = tables.next_id();
        tables.symptoms.push(SymptomRow {
            id,
            type_id,
            severity_id: symptom.severity_id,
            created: symptom.created,
        });

        Ok(SymptomRecord {
            id,
            name: type_name,
            severity_id: symptom.severity_id,
            severity,
            created: symptom.created,
        })
    }

    fn record_meal(&self, user_id: i32, meal: &NewMeal) -> StoreResult<MealRecord> {
        let mut tables = self.tables();
        if let Some(item) = meal
            .items
            .iter()
            .find(|item| !tables.foods.contains_key(&item.ndbno))
        {
            return Err(StoreError::UnknownFood(item.ndbno));
        }

        let row = Meal {
            id: tables.next_id(),
            user_id,
            name: meal.name.clone(),
            created: meal.created,
        };
        for item in &meal.items {
            tables.plates.push(PlateRow {
                meal_id: row.id,
                item: *item,
            });
        }
        let record = tables.record_of(&row);
        tables.meals.push(row);
        Ok(record)
    }

    fn meals_for_user(&self, user_id: i32) -> StoreResult<Vec<MealRecord>> {
        let tables = self.tables();
        Ok(tables
            .meals
            .iter()
            .filter(|meal| meal.user_id == user_id)
            .map(|meal| tables.record_of(meal))
            .collect())
    }

    fn symptoms_for_user(&self, user_id: i32) -> StoreResult<Vec<SymptomRecord>> {
        let tables = self.tables();
        let records = tables
            .symptoms
            .iter()
            .filter_map(|symptom| {
                let kind = tables
                    .symptom_types
                    .iter()
                    .find(|row| row.id == symptom.type_id && row.user_id == user_id)?;
                let severity = tables.severities.get(&symptom.severity_id)?;
                Some(SymptomRecord {
                    id: symptom.id,
                    name: kind.name.clone(),
                    severity_id: symptom.severity_id,
                    severity: severity.clone(),
                    created: symptom.created,
                })
            })
            .collect();
        Ok(records)
    }

    fn find_meal(&self, meal_id: i32) -> StoreResult<Option<Meal>> {
        Ok(self
            .tables()
            .meals
            .iter()
            .find(|meal| meal.id == meal_id)
            .cloned())
    }

    fn symptom_owner(&self, symptom_id: i32) -> StoreResult<Option<i32>> {
        let tables = self.tables();
        Ok(tables
            .symptoms
            .iter()
            .find(|symptom| symptom.id == symptom_id)
            .and_then(|symptom| {
                tables
                    .symptom_types
                    .iter()
                    .find(|row| row.id == symptom.type_id)
            })
            .map(|row| row.user_id))
    }

    fn delete_meal(&self, meal_id: i32) -> StoreResult<()> {
        let mut tables = self.tables();
        tables.plates.retain(|plate| plate.meal_id != meal_id);
        tables.meals.retain(|meal| meal.id != meal_id);
        Ok(())
    }

    fn delete_symptom(&self, symptom_id: i32) -> StoreResult<()> {
        self.tables()
            .symptoms
            .retain(|symptom| symptom.id != symptom_id);
        Ok(())
    }

    fn food_exists(&self, ndbno: i64) -> StoreResult<bool> {
        Ok(self.tables().foods.contains_key(&ndbno))
    }

    fn save_food(&self, food: &FoodRecord) -> StoreResult<()> {
        self.tables()
            .foods
            .entry(food.ndbno)
            .or_insert_with(|| food.clone());
        Ok(())
    }
}
