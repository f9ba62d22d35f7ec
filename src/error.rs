// Error handling module for the account API
// Provides the error taxonomy shared by every handler and the uniform failure envelope

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::validation::field_errors;

/// Main error type for the API
/// All handlers and services return Result<T, ApiError>
///
/// Each variant maps to one status category. The category is the contract;
/// the message is informational only.
#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation failures
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed request that is not tied to a single field (bad JSON, bad path id, bad upload)
    /// Maps to HTTP 400 Bad Request
    BadRequest(String),

    /// Missing, invalid or expired credentials
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Authenticated but not permitted
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Uniqueness violation or invalid state transition
    /// Maps to HTTP 409 Conflict
    Conflict { message: String },

    /// Database operation errors
    /// Maps to HTTP 500, details are never sent to the client
    DatabaseError(sqlx::Error),

    /// Hashing, signing, storage and other internal failures
    /// Maps to HTTP 500, details are never sent to the client
    InternalError(String),
}

/// Error payload nested under `error` in the failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level reasons for validation errors, omitted otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

/// Failure envelope: `{"success": false, "error": {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        let envelope = ErrorEnvelope {
            success: false,
            error: error_response,
        };
        (status, Json(envelope)).into_response()
    }
}

impl ApiError {
    /// Shorthand for a NotFound on an account id
    pub fn account_not_found(id: i64) -> Self {
        ApiError::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logs at a level matching the severity:
    /// - error!: database and internal errors (500-level)
    /// - warn!: auth failures and conflicts
    /// - debug!: expected client errors (validation, not found)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let (code, message, details) = match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let details = serde_json::to_value(field_errors(errors))
                    .unwrap_or_else(|_| serde_json::json!({}));
                (
                    "VALIDATION_ERROR",
                    "Request validation failed".to_string(),
                    Some(details),
                )
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                ("BAD_REQUEST", message.clone(), None)
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthenticated request: {}", message);
                ("UNAUTHORIZED", message.clone(), None)
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden request: {}", message);
                ("FORBIDDEN", message.clone(), None)
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ("NOT_FOUND", format!("{} with id {} not found", resource, id), None)
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ("CONFLICT", message.clone(), None)
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ("DATABASE_ERROR", "A database error occurred".to_string(), None)
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        (
            status,
            ErrorResponse {
                error_code: code.to_string(),
                message,
                details,
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ValidationError(errors) => write!(f, "validation failed: {}", errors),
            ApiError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            ApiError::NotFound { resource, id } => write!(f, "{} with id {} not found", resource, id),
            ApiError::Conflict { message } => write!(f, "conflict: {}", message),
            ApiError::DatabaseError(e) => write!(f, "database error: {}", e),
            ApiError::InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", error.body_text()))
    }
}
