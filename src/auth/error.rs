// Authentication and authorization error types

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::models::Role;
use crate::auth::token::TokenKind;
use crate::error::ApiError;

/// Authentication and authorization error types
#[derive(Debug, Error)]
pub enum AuthError {
    // Authentication errors
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Expected {expected} token")]
    WrongTokenKind { expected: TokenKind, actual: TokenKind },

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The token was valid but its account can no longer be loaded
    #[error("Account not found")]
    AccountUnavailable,

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    // Authorization errors
    /// User lacks the role required for the operation
    #[error("Insufficient permissions: required role '{required}', but user has role '{actual}'")]
    InsufficientPermissions { required: Role, actual: Role },

    /// User is neither the owner of the target account nor an admin
    #[error("Not allowed to modify account {target}")]
    NotOwner { target: i64 },
}

impl AuthError {
    /// Message that is safe to send to clients
    pub fn error_message(&self) -> String {
        match self {
            AuthError::PasswordHashError(_) | AuthError::TokenGenerationError(_) => {
                "Internal server error".to_string()
            }
            AuthError::InsufficientPermissions { required, .. } => {
                format!("Insufficient permissions: required role '{}'", required)
            }
            other => other.to_string(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::WrongTokenKind { .. }
            | AuthError::InvalidCredentials
            | AuthError::AccountUnavailable => ApiError::Unauthorized(err.error_message()),
            AuthError::InsufficientPermissions { .. } | AuthError::NotOwner { .. } => {
                ApiError::Forbidden(err.error_message())
            }
            AuthError::PasswordHashError(msg) => {
                ApiError::InternalError(format!("password hashing failed: {}", msg))
            }
            AuthError::TokenGenerationError(msg) => {
                ApiError::InternalError(format!("token signing failed: {}", msg))
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
