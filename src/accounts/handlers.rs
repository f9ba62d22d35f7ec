// HTTP handlers for account endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        multipart::MultipartRejection,
        Multipart, Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use utoipa::ToSchema;

use crate::accounts::export::EXPORT_FILENAME;
use crate::accounts::models::{
    AccountEnvelope, AccountListQuery, AccountPage, CreateAccountRequest, UpdateAccountRequest,
};
use crate::auth::middleware::{AuthenticatedUser, RequestMeta};
use crate::error::ApiError;
use crate::response::{ApiResponse, ApiResult, MessageResponse};
use crate::validation::parse_account_id;
use crate::AppState;

/// Multipart field carrying the avatar file
pub const AVATAR_FIELD: &str = "avatar";

/// Multipart body of an avatar upload, for the API docs
#[derive(ToSchema)]
pub struct AvatarUpload {
    /// jpg, jpeg, png, gif or webp
    #[schema(value_type = String, format = Binary)]
    pub avatar: Vec<u8>,
}

fn path_id(raw: &str) -> Result<i64, ApiError> {
    parse_account_id(raw).ok_or_else(|| ApiError::BadRequest("Invalid user id".to_string()))
}

fn list_query(
    query: Result<Query<AccountListQuery>, QueryRejection>,
) -> Result<AccountListQuery, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::BadRequest(format!("Invalid query parameters: {}", e.body_text())))
}

/// Handler for GET /users
/// Lists active accounts; admins may also request soft-deleted ones
#[utoipa::path(
    get,
    path = "/users",
    params(AccountListQuery),
    responses(
        (status = 200, description = "One page of accounts", body = AccountPage),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "accounts"
)]
pub async fn list_accounts_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<AccountListQuery>, QueryRejection>,
) -> ApiResult<AccountPage> {
    let query = list_query(query)?;
    let caller_is_admin = state.policy.role_of(user.user_id).await?.is_admin();

    let page = state.account_service.list(&query, caller_is_admin).await?;
    Ok(ApiResponse::ok(page))
}

/// Handler for GET /user/:id
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountEnvelope),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "No active account with this id")
    ),
    tag = "accounts"
)]
pub async fn get_account_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<AccountEnvelope> {
    let id = path_id(&raw_id)?;
    let account = state.account_service.get(id).await?;
    Ok(ApiResponse::ok(account.into()))
}

/// Handler for PUT /user/:id
/// Self or admin; only the supplied fields change
#[utoipa::path(
    put,
    path = "/user/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountEnvelope),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Neither the owner nor an admin"),
        (status = 404, description = "No active account with this id"),
        (status = 409, description = "Email or nickname already in use")
    ),
    tag = "accounts"
)]
pub async fn update_account_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult<AccountEnvelope> {
    let id = path_id(&raw_id)?;
    let Json(request) = payload?;

    let account = state
        .account_service
        .update(&meta.audit_context(user.user_id), id, request)
        .await?;
    Ok(ApiResponse::ok(account.into()))
}

/// Handler for DELETE /user/:id
/// Self or admin; soft delete
#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 403, description = "Neither the owner nor an admin"),
        (status = 404, description = "No active account with this id")
    ),
    tag = "accounts"
)]
pub async fn delete_account_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(raw_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let id = path_id(&raw_id)?;
    state
        .account_service
        .soft_delete(&meta.audit_context(user.user_id), id)
        .await?;
    Ok(ApiResponse::ok(MessageResponse::new("User deleted")))
}

/// Handler for POST /user
/// Admin only
#[utoipa::path(
    post,
    path = "/user",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountEnvelope),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email or nickname already in use")
    ),
    tag = "admin"
)]
pub async fn create_account_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<AccountEnvelope> {
    let Json(request) = payload?;
    let account = state
        .account_service
        .create(&meta.audit_context(user.user_id), request)
        .await?;
    Ok(ApiResponse::created(account.into()))
}

/// Handler for POST /user/:id/restore
/// Admin only
#[utoipa::path(
    post,
    path = "/user/{id}/restore",
    params(("id" = i64, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account restored", body = MessageResponse),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No account with this id"),
        (status = 409, description = "Account is not deleted")
    ),
    tag = "admin"
)]
pub async fn restore_account_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    Path(raw_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let id = path_id(&raw_id)?;
    state
        .account_service
        .restore(&meta.audit_context(user.user_id), id)
        .await?;
    Ok(ApiResponse::ok(MessageResponse::new("User restored")))
}

/// Handler for GET /users/export
/// Admin only; same filters as the listing, without pagination
#[utoipa::path(
    get,
    path = "/users/export",
    params(AccountListQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 403, description = "Admin role required")
    ),
    tag = "admin"
)]
pub async fn export_accounts_handler(
    State(state): State<AppState>,
    query: Result<Query<AccountListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = list_query(query)?;
    let csv = state.account_service.export_csv(&query).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Handler for POST /me/avatar
/// Multipart upload; the file must be sent in the `avatar` field
#[utoipa::path(
    post,
    path = "/me/avatar",
    request_body(content = AvatarUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = AccountEnvelope),
        (status = 400, description = "Missing, empty, oversized or unsupported file")
    ),
    tag = "accounts"
)]
pub async fn upload_avatar_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    meta: RequestMeta,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<AccountEnvelope> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e.body_text())))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        let account = state
            .account_service
            .upload_avatar(&meta.audit_context(user.user_id), &filename, &bytes)
            .await?;
        return Ok(ApiResponse::ok(account.into()));
    }

    Err(ApiError::BadRequest(format!(
        "Missing file field '{}'",
        AVATAR_FIELD
    )))
}
