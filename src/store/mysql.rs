use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use failsafe::CircuitBreaker;
use log::info;

use super::{EventStore, StoreError, StoreResult};
use crate::models::{
    FoodRecord, Meal, MealRecord, NewFoodRow, NewIngredientRow, NewMeal, NewMealRow, NewPlateRow,
    NewSymptom, NewSymptomRow, SymptomRecord, User,
};
use crate::{query, CircuitBreakerType};

pub type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

const DB_POOL_MAX_OPEN: u32 = 16;
const DB_POOL_TIMEOUT_SECONDS: u64 = 10;

embed_migrations!("migrations");

/// [`EventStore`] over a MySQL connection pool. Every call goes through a
/// circuit breaker so a dead database fails requests fast.
#[derive(Clone)]
pub struct MysqlStore {
    pool: DbPool,
    circuit_breaker: CircuitBreakerType,
}

impl MysqlStore {
    pub fn connect(database_url: &str, run_migrations: bool) -> StoreResult<Self> {
        let manager = ConnectionManager::<MysqlConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(DB_POOL_MAX_OPEN)
            .connection_timeout(Duration::from_secs(DB_POOL_TIMEOUT_SECONDS))
            .build(manager)?;

        if run_migrations {
            let conn = pool.get()?;
            embedded_migrations::run(&*conn).map_err(|e| StoreError::Migration(e.to_string()))?;
            info!("database migrations applied");
        }

        Ok(Self::new(pool))
    }

    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            circuit_breaker: crate::circuit_breaker(),
        }
    }

    fn call<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&MysqlConnection) -> StoreResult<T>,
    {
        // rejected requests (unknown food, ...) must not trip the breaker
        let result = self.circuit_breaker.call_with(StoreError::is_outage, || -> StoreResult<T> {
            let conn = self.pool.get()?;
            f(&*conn)
        });
        match result {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Rejected) => Err(StoreError::Unavailable),
            Err(failsafe::Error::Inner(e)) => Err(e),
        }
    }
}

impl EventStore for MysqlStore {
    fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        self.call(|conn| Ok(query::find_user_by_username(conn, username)?))
    }

    fn record_symptom(&self, user_id: i32, symptom: &NewSymptom) -> StoreResult<SymptomRecord> {
        let type_name = symptom.type_name();
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|| {
                let severity = query::find_severity_name(conn, symptom.severity_id)?
                    .ok_or(StoreError::UnknownSeverity(symptom.severity_id))?;
                let type_id = query::find_or_create_symptom_type(conn, user_id, &type_name)?;
                let id = query::insert_symptom(
                    conn,
                    &NewSymptomRow {
                        type_id,
                        severity_id: symptom.severity_id,
                        created: symptom.created,
                    },
                )?;
                Ok(SymptomRecord {
                    id,
                    name: type_name.clone(),
                    severity_id: symptom.severity_id,
                    severity,
                    created: symptom.created,
                })
            })
        })
    }

    fn record_meal(&self, user_id: i32, meal: &NewMeal) -> StoreResult<MealRecord> {
        let ndbnos: Vec<i64> = meal.items.iter().map(|item| item.ndbno).collect();
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|| {
                if let Some(ndbno) = query::find_missing_foods(conn, &ndbnos)?.first() {
                    return Err(StoreError::UnknownFood(*ndbno));
                }

                let meal_id = query::insert_meal(
                    conn,
                    &NewMealRow {
                        user_id,
                        name: &meal.name,
                        created: meal.created,
                    },
                )?;
                let plates: Vec<NewPlateRow> = meal
                    .items
                    .iter()
                    .map(|item| NewPlateRow {
                        meal_id,
                        ndbno: item.ndbno,
                        quantity: item.quantity,
                    })
                    .collect();
                query::insert_plates(conn, &plates)?;

                let items = query::find_meal_items(conn, &[meal_id])?
                    .remove(&meal_id)
                    .unwrap_or_default();
                Ok(MealRecord {
                    id: meal_id,
                    name: meal.name.clone(),
                    created: meal.created,
                    items,
                })
            })
        })
    }

    fn meals_for_user(&self, user_id: i32) -> StoreResult<Vec<MealRecord>> {
        self.call(|conn| {
            let meals = query::find_meals_for_user(conn, user_id)?;
            let meal_ids: Vec<i32> = meals.iter().map(|meal| meal.id).collect();
            let mut items = query::find_meal_items(conn, &meal_ids)?;

            Ok(meals
                .into_iter()
                .map(|meal| MealRecord {
                    items: items.remove(&meal.id).unwrap_or_default(),
                    id: meal.id,
                    name: meal.name,
                    created: meal.created,
                })
                .collect())
        })
    }

    fn symptoms_for_user(&self, user_id: i32) -> StoreResult<Vec<SymptomRecord>> {
        self.call(|conn| Ok(query::find_symptoms_for_user(conn, user_id)?))
    }

    fn find_meal(&self, meal_id: i32) -> StoreResult<Option<Meal>> {
        self.call(|conn| Ok(query::find_meal(conn, meal_id)?))
    }

    fn symptom_owner(&self, symptom_id: i32) -> StoreResult<Option<i32>> {
        self.call(|conn| Ok(query::find_symptom_owner(conn, symptom_id)?))
    }

    fn delete_meal(&self, meal_id: i32) -> StoreResult<()> {
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|| {
                query::delete_meal(conn, meal_id)?;
                Ok(())
            })
        })
    }

    fn delete_symptom(&self, symptom_id: i32) -> StoreResult<()> {
        self.call(|conn| {
            query::delete_symptom(conn, symptom_id)?;
            Ok(())
        })
    }

    fn food_exists(&self, ndbno: i64) -> StoreResult<bool> {
        self.call(|conn| Ok(query::food_exists(conn, ndbno)?))
    }

    fn save_food(&self, food: &FoodRecord) -> StoreResult<()> {
        self.call(|conn| {
            conn.transaction::<_, StoreError, _>(|| {
                if query::food_exists(conn, food.ndbno)? {
                    return Ok(());
                }
                let ingredient_rows: Vec<NewIngredientRow> = food
                    .ingredients
                    .iter()
                    .map(|name| NewIngredientRow {
                        food: food.ndbno,
                        name,
                    })
                    .collect();
                query::insert_food(
                    conn,
                    &NewFoodRow {
                        ndbno: food.ndbno,
                        name: &food.name,
                    },
                    &ingredient_rows,
                )?;
                Ok(())
            })
        })
    }
}
