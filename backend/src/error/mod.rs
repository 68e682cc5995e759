use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::location::Coordinates;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Raised when a reported position lies outside a session's geofence.
///
/// Carries everything a client needs to tell the attendee how far off they are.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("you are {distance_m:.0}m away, need to be within {radius_m:.0}m")]
pub struct GeofenceViolation {
    pub distance_m: f64,
    pub radius_m: f64,
    pub location: Coordinates,
    pub anchor: Coordinates,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    RecordNotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InvalidState(String),
    BadRequest(String),
    GeofenceViolation(Box<GeofenceViolation>),
    InternalServerError(anyhow::Error),
    Validation(Vec<String>),
}

impl AppError {
    /// Stable machine-readable code, shared by the JSON body and log lines.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::GeofenceViolation(_) => "GEOFENCE_VIOLATION",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code().to_string();
        let (status, error_message, details) = match self {
            AppError::NotFound(msg) | AppError::RecordNotFound(msg) => {
                (StatusCode::NOT_FOUND, msg, None)
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::Conflict(msg) | AppError::InvalidState(msg) => {
                (StatusCode::CONFLICT, msg, None)
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::GeofenceViolation(violation) => (
                StatusCode::FORBIDDEN,
                violation.to_string(),
                serde_json::to_value(&*violation).ok(),
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<GeofenceViolation> for AppError {
    fn from(violation: GeofenceViolation) -> Self {
        AppError::GeofenceViolation(Box::new(violation))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::InternalServerError(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}
