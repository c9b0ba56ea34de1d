use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use policy::PolicyError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::schemas::ErrorResponse;

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or expired credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Authorization, visibility, validation and referential failures
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Anything else that is our fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Policy(PolicyError::Validation(errors))
    }
}

/// Flattens field errors into `{field: [message, ...]}`.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, fields) = match &self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", None),
            ApiError::Policy(PolicyError::Forbidden { .. }) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", None)
            }
            ApiError::Policy(PolicyError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            ApiError::Policy(PolicyError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                Some(field_messages(errors)),
            ),
            ApiError::Policy(PolicyError::Referential(_)) => {
                (StatusCode::CONFLICT, "REFERENTIAL_VIOLATION", None)
            }
            ApiError::Policy(PolicyError::Database(_)) | ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", None)
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        };

        let message = match &self {
            ApiError::Policy(PolicyError::Validation(_)) => "Validation failed".to_string(),
            ApiError::Policy(PolicyError::Database(_)) | ApiError::Database(_) => {
                error!("Database failure while handling request: {}", self);
                "A database error occurred".to_string()
            }
            ApiError::Internal(_) => {
                error!("Internal failure while handling request: {}", self);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
            fields,
        };
        (status, Json(body)).into_response()
    }
}
