use std::collections::HashMap;
use std::convert::TryFrom;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Bigint, Unsigned};

use crate::models::{
    Meal, MealItem, NewFoodRow, NewIngredientRow, NewMealRow, NewPlateRow, NewSymptomRow,
    NewSymptomTypeRow, SymptomRecord, User,
};
use crate::schema::{food, ingredients, meals, plates, severity, symptom_types, symptoms, users};

no_arg_sql_function!(last_insert_id, Unsigned<Bigint>);

fn inserted_id(conn: &MysqlConnection) -> QueryResult<i32> {
    let id: u64 = diesel::select(last_insert_id).get_result(conn)?;
    i32::try_from(id).map_err(|e| DieselError::DeserializationError(Box::new(e)))
}

pub(crate) fn find_user_by_username(conn: &MysqlConnection, name: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(name))
        .first::<User>(conn)
        .optional()
}

pub(crate) fn find_severity_name(conn: &MysqlConnection, severity_id: i32) -> QueryResult<Option<String>> {
    severity::table
        .filter(severity::id.eq(severity_id))
        .select(severity::name)
        .first(conn)
        .optional()
}

/// Returns the id of the user's symptom type called `name`, creating it on
/// first use. `name` must already be lowercase.
///
/// When two first uses race, the losing insert hits the unique key and the
/// row is read back with a locking read, which sees the winner's commit.
pub(crate) fn find_or_create_symptom_type(
    conn: &MysqlConnection,
    owner: i32,
    name: &str,
) -> QueryResult<i32> {
    let by_name = || {
        symptom_types::table
            .filter(symptom_types::user_id.eq(owner))
            .filter(symptom_types::name.eq(name))
            .select(symptom_types::id)
    };

    if let Some(type_id) = by_name().first::<i32>(conn).optional()? {
        return Ok(type_id);
    }

    let inserted = diesel::insert_into(symptom_types::table)
        .values(&NewSymptomTypeRow {
            user_id: owner,
            name,
        })
        .execute(conn);
    match inserted {
        Ok(_) => inserted_id(conn),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            by_name().for_update().first::<i32>(conn)
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn insert_symptom(conn: &MysqlConnection, row: &NewSymptomRow) -> QueryResult<i32> {
    diesel::insert_into(symptoms::table).values(row).execute(conn)?;
    inserted_id(conn)
}

pub(crate) fn find_symptoms_for_user(conn: &MysqlConnection, owner: i32) -> QueryResult<Vec<SymptomRecord>> {
    let rows = symptoms::table
        .inner_join(symptom_types::table)
        .inner_join(severity::table)
        .filter(symptom_types::user_id.eq(owner))
        .order(symptoms::id.asc())
        .select((
            symptoms::id,
            symptom_types::name,
            symptoms::severity_id,
            severity::name,
            symptoms::created,
        ))
        .load::<(i32, String, i32, String, chrono::NaiveDateTime)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, name, severity_id, severity, created)| SymptomRecord {
            id,
            name,
            severity_id,
            severity,
            created,
        })
        .collect())
}

/// Owner of a symptom event, resolved through its symptom type.
pub(crate) fn find_symptom_owner(conn: &MysqlConnection, symptom_id: i32) -> QueryResult<Option<i32>> {
    symptoms::table
        .inner_join(symptom_types::table)
        .filter(symptoms::id.eq(symptom_id))
        .select(symptom_types::user_id)
        .first(conn)
        .optional()
}

pub(crate) fn delete_symptom(conn: &MysqlConnection, symptom_id: i32) -> QueryResult<usize> {
    diesel::delete(symptoms::table.filter(symptoms::id.eq(symptom_id))).execute(conn)
}

pub(crate) fn find_missing_foods(conn: &MysqlConnection, ndbnos: &[i64]) -> QueryResult<Vec<i64>> {
    if ndbnos.is_empty() {
        return Ok(Vec::new());
    }
    let known: Vec<i64> = food::table
        .filter(food::ndbno.eq_any(ndbnos))
        .select(food::ndbno)
        .load(conn)?;
    Ok(ndbnos
        .iter()
        .copied()
        .filter(|ndbno| !known.contains(ndbno))
        .collect())
}

pub(crate) fn insert_meal(conn: &MysqlConnection, row: &NewMealRow) -> QueryResult<i32> {
    diesel::insert_into(meals::table).values(row).execute(conn)?;
    inserted_id(conn)
}

pub(crate) fn insert_plates(conn: &MysqlConnection, rows: &[NewPlateRow]) -> QueryResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    diesel::insert_into(plates::table).values(rows).execute(conn)
}

pub(crate) fn find_meal(conn: &MysqlConnection, meal_id: i32) -> QueryResult<Option<Meal>> {
    meals::table
        .filter(meals::id.eq(meal_id))
        .first::<Meal>(conn)
        .optional()
}

pub(crate) fn find_meals_for_user(conn: &MysqlConnection, owner: i32) -> QueryResult<Vec<Meal>> {
    meals::table
        .filter(meals::user_id.eq(owner))
        .order(meals::id.asc())
        .load::<Meal>(conn)
}

/// Loads the plated foods of every meal in `meal_ids`, ingredients included,
/// with two queries regardless of how many meals or foods are involved.
pub(crate) fn find_meal_items(
    conn: &MysqlConnection,
    meal_ids: &[i32],
) -> QueryResult<HashMap<i32, Vec<MealItem>>> {
    let mut items: HashMap<i32, Vec<MealItem>> = HashMap::new();
    if meal_ids.is_empty() {
        return Ok(items);
    }

    let plated = plates::table
        .inner_join(food::table)
        .filter(plates::meal_id.eq_any(meal_ids))
        .order(plates::id.asc())
        .select((plates::meal_id, plates::ndbno, plates::quantity, food::name))
        .load::<(i32, i64, i32, String)>(conn)?;

    let mut ndbnos: Vec<i64> = plated.iter().map(|row| row.1).collect();
    ndbnos.sort_unstable();
    ndbnos.dedup();
    let ingredients_by_food = find_ingredients(conn, &ndbnos)?;

    for (meal_id, ndbno, quantity, name) in plated {
        let ingredients = ingredients_by_food.get(&ndbno).cloned().unwrap_or_default();
        items.entry(meal_id).or_default().push(MealItem {
            ndbno,
            name,
            quantity,
            ingredients,
        });
    }
    Ok(items)
}

fn find_ingredients(conn: &MysqlConnection, ndbnos: &[i64]) -> QueryResult<HashMap<i64, Vec<String>>> {
    let rows = ingredients::table
        .filter(ingredients::food.eq_any(ndbnos))
        .order(ingredients::id.asc())
        .select((ingredients::food, ingredients::name))
        .load::<(i64, String)>(conn)?;

    let mut by_food: HashMap<i64, Vec<String>> = HashMap::new();
    for (ndbno, name) in rows {
        by_food.entry(ndbno).or_default().push(name);
    }
    Ok(by_food)
}

/// Removes a meal and its plates. Callers run this inside a transaction.
pub(crate) fn delete_meal(conn: &MysqlConnection, meal_id: i32) -> QueryResult<usize> {
    diesel::delete(plates::table.filter(plates::meal_id.eq(meal_id))).execute(conn)?;
    diesel::delete(meals::table.filter(meals::id.eq(meal_id))).execute(conn)
}

pub(crate) fn food_exists(conn: &MysqlConnection, ndbno: i64) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(food::table.filter(food::ndbno.eq(ndbno)))).get_result(conn)
}

pub(crate) fn insert_food(
    conn: &MysqlConnection,
    row: &NewFoodRow,
    ingredient_rows: &[NewIngredientRow],
) -> QueryResult<()> {
    diesel::insert_into(food::table).values(row).execute(conn)?;
    if !ingredient_rows.is_empty() {
        diesel::insert_into(ingredients::table)
            .values(ingredient_rows)
            .execute(conn)?;
    }
    Ok(())
}
