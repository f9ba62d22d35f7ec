// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use cookie::{Cookie, SameSite};

use crate::accounts::models::AccountEnvelope;
use crate::auth::{
    middleware::AuthenticatedUser,
    models::{AccessTokenResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    token::REFRESH_TOKEN_TTL_SECS,
};
use crate::error::ApiError;
use crate::response::{ApiResponse, ApiResult, MessageResponse};
use crate::AppState;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// `Set-Cookie` value carrying the refresh token
fn refresh_cookie(value: String, secure: bool) -> String {
    Cookie::build((REFRESH_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(cookie::time::Duration::seconds(REFRESH_TOKEN_TTL_SECS))
        .build()
        .to_string()
}

/// `Set-Cookie` value that expires the refresh cookie
fn cleared_cookie(secure: bool) -> String {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(cookie::time::Duration::ZERO)
        .build()
        .to_string()
}

/// Reads the refresh token from the Cookie header, if present
fn refresh_from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == REFRESH_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_string())
}

/// Register a new user
/// POST /register
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, tokens issued", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or nickname already in use")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let auth = state.auth_service.register(request).await?;

    let cookie = refresh_cookie(auth.refresh_token.clone(), state.cookie_secure);
    let (status, body) = ApiResponse::created(auth);
    Ok((status, [(header::SET_COOKIE, cookie)], body).into_response())
}

/// Login a user
/// POST /login
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, tokens issued", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let auth = state.auth_service.login(request).await?;

    let cookie = refresh_cookie(auth.refresh_token.clone(), state.cookie_secure);
    let (status, body) = ApiResponse::ok(auth);
    Ok((status, [(header::SET_COOKIE, cookie)], body).into_response())
}

/// Issue a new access token
/// POST /refresh
///
/// The refresh token is taken from the `refresh_token` cookie, falling back
/// to the JSON body.
#[utoipa::path(
    post,
    path = "/refresh",
    request_body(content = RefreshRequest, description = "Only needed when the cookie is absent"),
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Missing, invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<AccessTokenResponse> {
    let token = refresh_from_cookie(&headers)
        .or_else(|| body.map(|Json(req)| req.refresh_token))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token not found".to_string()))?;

    let response = state.auth_service.refresh_access(&token)?;
    Ok(ApiResponse::ok(response))
}

/// Clear the refresh cookie
/// POST /logout
///
/// Tokens are stateless; already-issued tokens stay valid until they expire.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Refresh cookie cleared")),
    tag = "auth"
)]
pub async fn logout_handler(State(state): State<AppState>) -> Response {
    let (status, body) = ApiResponse::ok(MessageResponse::new("Logged out successfully"));
    (
        status,
        [(header::SET_COOKIE, cleared_cookie(state.cookie_secure))],
        body,
    )
        .into_response()
}

/// Get current user information (protected endpoint)
/// GET /me
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current account", body = AccountEnvelope),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<AccountEnvelope> {
    let account = state.auth_service.current_user(user.user_id).await?;
    Ok(ApiResponse::ok(account.into()))
}
