//! Declarative request validation.
//!
//! Each payload is described by a slice of [`Field`]s. [`check`] walks the
//! schema against the raw JSON object and reports the first offending field
//! with a message naming it; only then is the body deserialized into its
//! typed form with [`parse`].

use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

pub type Object = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Non-empty after trimming, at most `max_chars` characters.
    Text { max_chars: usize },
    /// Like `Text`, but the limit applies to the lowercased form, which is
    /// what gets stored. Some characters grow when lowercased.
    FoldedText { max_chars: usize },
    Integer,
    /// Non-empty list of food references, each a bare ndbno or a
    /// `{ndbno, quantity}` object.
    Plates,
    /// RFC 3339 string within the years a MySQL `DATETIME` can hold.
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

pub const SYMPTOM_FIELDS: &[Field] = &[
    Field::required("symptom", Kind::FoldedText { max_chars: 20 }),
    Field::required("severity", Kind::Integer),
    Field::optional("time", Kind::Timestamp),
];

pub const MEAL_FIELDS: &[Field] = &[
    Field::required("name", Kind::Text { max_chars: 40 }),
    Field::required("items", Kind::Plates),
    Field::optional("time", Kind::Timestamp),
];

// `type` is read by `event_kind` before the schema is checked
pub const DELETE_FIELDS: &[Field] = &[Field::required("id", Kind::Integer)];

pub const PLATE_FIELDS: &[Field] = &[
    Field::required("ndbno", Kind::Integer),
    Field::optional("quantity", Kind::Integer),
];

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;

pub const FOOD_IMPORT_FIELDS: &[Field] = &[Field::required("ndbno", Kind::Integer)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Meal,
    Symptom,
}

pub fn object(body: Value) -> Result<Object, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::Validation(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// Reads the `type` discriminator of an event payload.
pub fn event_kind(body: &Object) -> Result<EventKind, ApiError> {
    match body.get("type") {
        None | Some(Value::Null) => Err(ApiError::Validation("type is required".to_string())),
        Some(Value::String(kind)) => match kind.as_str() {
            "meal" => Ok(EventKind::Meal),
            "symptom" => Ok(EventKind::Symptom),
            other => Err(ApiError::UnsupportedType(other.to_string())),
        },
        Some(_) => Err(ApiError::Validation("type must be a string".to_string())),
    }
}

pub fn check(body: &Object, schema: &[Field]) -> Result<(), ApiError> {
    for field in schema {
        match body.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(invalid(field, "is required"));
                }
            }
            Some(value) => check_value(field, value)?,
        }
    }
    Ok(())
}

fn check_value(field: &Field, value: &Value) -> Result<(), ApiError> {
    match field.kind {
        Kind::Text { max_chars } => {
            let text = non_empty_text(field, value)?;
            check_length(field, text, max_chars)?;
        }
        Kind::FoldedText { max_chars } => {
            let text = non_empty_text(field, value)?;
            check_length(field, &text.to_lowercase(), max_chars)?;
        }
        Kind::Integer => {
            value
                .as_i64()
                .ok_or_else(|| invalid(field, "must be an integer"))?;
        }
        Kind::Plates => {
            let list = value
                .as_array()
                .ok_or_else(|| invalid(field, "must be a list"))?;
            if list.is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
            for (index, item) in list.iter().enumerate() {
                check_plate(field, index, item)?;
            }
        }
        Kind::Timestamp => {
            let time = value
                .as_str()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .ok_or_else(|| invalid(field, "must be an RFC 3339 timestamp"))?;
            let year = time.with_timezone(&Utc).year();
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(invalid(
                    field,
                    &format!("must be between the years {} and {}", MIN_YEAR, MAX_YEAR),
                ));
            }
        }
    }
    Ok(())
}

fn non_empty_text<'a>(field: &Field, value: &'a Value) -> Result<&'a str, ApiError> {
    let text = value
        .as_str()
        .ok_or_else(|| invalid(field, "must be a string"))?
        .trim();
    if text.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(text)
}

fn check_length(field: &Field, text: &str, max_chars: usize) -> Result<(), ApiError> {
    if text.chars().count() > max_chars {
        return Err(invalid(
            field,
            &format!("must be at most {} characters", max_chars),
        ));
    }
    Ok(())
}

fn check_plate(field: &Field, index: usize, item: &Value) -> Result<(), ApiError> {
    match item {
        Value::Number(n) if n.is_i64() => Ok(()),
        // messages from the nested schema start with the nested field name
        Value::Object(plate) => check(plate, PLATE_FIELDS).map_err(|e| {
            ApiError::Validation(format!("{}[{}].{}", field.name, index, e))
        }),
        _ => Err(ApiError::Validation(format!(
            "{}[{}] must be an ndbno or an object with an ndbno",
            field.name, index
        ))),
    }
}

fn invalid(field: &Field, problem: &str) -> ApiError {
    ApiError::Validation(format!("{} {}", field.name, problem))
}

/// Deserializes a body that already passed [`check`].
pub fn parse<T: DeserializeOwned>(body: Object) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::Validation(format!("invalid payload: {}", e)))
}
