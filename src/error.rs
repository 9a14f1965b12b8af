use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
};
use thiserror::Error;

use crate::db::StoreError;
use crate::models::ProductValidationError;

/// Handler outcome classification. Each variant maps to exactly one status
/// code; the envelope body comes from the response table, so the detail
/// carried here is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[source] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("product {id}")),
            StoreError::DuplicateSku(sku) => Self::Conflict(format!("sku {sku} already exists")),
            other => Self::Internal(other),
        }
    }
}

impl From<ProductValidationError> for ApiError {
    fn from(err: ProductValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        assert_eq!(
            ApiError::from(StoreError::NotFound(4)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::DuplicateSku("ABC".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(StoreError::MissingReference { kind: "brand", id: 3 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = ApiError::from(ProductValidationError::Blank("sku"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Bad request: sku must not be blank");
    }

    #[test]
    fn internal_errors_display_the_cause() {
        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert!(err.to_string().starts_with("Internal error: database error"));
    }
}
