use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::food_api::FoodApiError;
use crate::store::StoreError;

/// Every failure a route can answer with. The body is always
/// `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("unsupported event type '{0}'")]
    UnsupportedType(String),

    #[error("unauthorized request")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("internal server error")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownFood(ndbno) => ApiError::Validation(format!(
                "unknown food {}; import it through /api/food first",
                ndbno
            )),
            StoreError::UnknownSeverity(id) => {
                ApiError::Validation(format!("unknown severity {}", id))
            }
            StoreError::Unavailable => ApiError::Unavailable("data store unavailable".to_string()),
            other => {
                error!("data store failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<FoodApiError> for ApiError {
    fn from(err: FoodApiError) -> Self {
        match err {
            FoodApiError::Unavailable => {
                ApiError::Unavailable("food database unavailable".to_string())
            }
            other => {
                error!("food database failure: {}", other);
                ApiError::Upstream("food database request failed".to_string())
            }
        }
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        error!("blocking task failed: {}", err);
        ApiError::Internal(err.to_string())
    }
}
