//! Persistence for users, events and imported foods.
//!
//! Handlers only see [`EventStore`]; the MySQL implementation backs the
//! running server and [`MemoryStore`] backs tests. Every operation that
//! writes more than one row is atomic in both.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::models::{FoodRecord, Meal, MealRecord, NewMeal, NewSymptom, SymptomRecord, User};

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::{DbPool, MysqlStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),

    /// The circuit breaker rejected the call without touching the database.
    #[error("data store unavailable")]
    Unavailable,

    #[error("unknown food {0}")]
    UnknownFood(i64),

    #[error("unknown severity {0}")]
    UnknownSeverity(i32),
}

impl StoreError {
    /// Whether the error says something about the health of the database,
    /// as opposed to a rejected request.
    pub fn is_outage(&self) -> bool {
        match self {
            StoreError::Database(DieselError::DatabaseError(kind, _)) => !matches!(
                kind,
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation
            ),
            StoreError::Database(DieselError::NotFound) => false,
            StoreError::Database(_) | StoreError::Pool(_) | StoreError::Unavailable => true,
            StoreError::Migration(_) | StoreError::UnknownFood(_) | StoreError::UnknownSeverity(_) => {
                false
            }
        }
    }
}

/// Blocking data access for the event and food routes. Implementations are
/// called from `web::block`.
pub trait EventStore: Send + Sync {
    fn find_user(&self, username: &str) -> StoreResult<Option<User>>;

    /// Resolves or creates the user's symptom type, then records the event.
    fn record_symptom(&self, user_id: i32, symptom: &NewSymptom) -> StoreResult<SymptomRecord>;

    /// Stores the meal and one plate per item, then reads it back with its
    /// foods and ingredients. Fails with [`StoreError::UnknownFood`] before
    /// writing anything if an item references a food that was never imported.
    fn record_meal(&self, user_id: i32, meal: &NewMeal) -> StoreResult<MealRecord>;

    fn meals_for_user(&self, user_id: i32) -> StoreResult<Vec<MealRecord>>;

    fn symptoms_for_user(&self, user_id: i32) -> StoreResult<Vec<SymptomRecord>>;

    fn find_meal(&self, meal_id: i32) -> StoreResult<Option<Meal>>;

    /// `None` when the symptom event does not exist.
    fn symptom_owner(&self, symptom_id: i32) -> StoreResult<Option<i32>>;

    fn delete_meal(&self, meal_id: i32) -> StoreResult<()>;

    fn delete_symptom(&self, symptom_id: i32) -> StoreResult<()>;

    fn food_exists(&self, ndbno: i64) -> StoreResult<bool>;

    fn save_food(&self, food: &FoodRecord) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_error(kind: DatabaseErrorKind) -> StoreError {
        StoreError::Database(DieselError::DatabaseError(
            kind,
            Box::new("constraint failed".to_string()),
        ))
    }

    #[test]
    fn constraint_violations_are_not_outages() {
        assert!(!database_error(DatabaseErrorKind::UniqueViolation).is_outage());
        assert!(!database_error(DatabaseErrorKind::ForeignKeyViolation).is_outage());
        assert!(!StoreError::Database(DieselError::NotFound).is_outage());
        assert!(!StoreError::UnknownFood(7).is_outage());
        assert!(!StoreError::UnknownSeverity(9).is_outage());
    }

    #[test]
    fn connection_failures_are_outages() {
        assert!(database_error(DatabaseErrorKind::UnableToSendCommand).is_outage());
        assert!(StoreError::Unavailable.is_outage());
        assert!(StoreError::Database(DieselError::RollbackTransaction).is_outage());
    }
}
