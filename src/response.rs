// Success envelope shared by all handlers

use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with the given payload
    pub fn ok(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(Self { success: true, data }))
    }

    /// 201 Created with the given payload
    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(Self { success: true, data }))
    }
}

/// Payload for operations that only report an outcome
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Handler return type for envelope responses
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), crate::error::ApiError>;
