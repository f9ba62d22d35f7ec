pub mod accounts;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod storage;
pub mod validation;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use accounts::{AccountService, AccountStore};
use audit::{AuditRecorder, AuditStore};
use auth::{AuthService, AuthorizationPolicy, PasswordService, TokenService};
use storage::FileStorage;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::logout_handler,
        auth::handlers::me_handler,
        accounts::handlers::list_accounts_handler,
        accounts::handlers::get_account_handler,
        accounts::handlers::update_account_handler,
        accounts::handlers::delete_account_handler,
        accounts::handlers::create_account_handler,
        accounts::handlers::restore_account_handler,
        accounts::handlers::export_accounts_handler,
        accounts::handlers::upload_avatar_handler,
        audit::handlers::list_audit_logs_handler,
    ),
    components(
        schemas(
            auth::models::Role,
            auth::models::RegisterRequest,
            auth::models::LoginRequest,
            auth::models::RefreshRequest,
            auth::models::AuthResponse,
            auth::models::AccessTokenResponse,
            accounts::models::AccountView,
            accounts::models::AccountEnvelope,
            accounts::models::AccountPage,
            accounts::models::CreateAccountRequest,
            accounts::models::UpdateAccountRequest,
            accounts::handlers::AvatarUpload,
            audit::models::AuditLogEntry,
            audit::models::AuditLogList,
            response::MessageResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and token renewal"),
        (name = "accounts", description = "Account profiles"),
        (name = "admin", description = "Admin-only account management and audit log")
    ),
    info(
        title = "Account API",
        version = "1.0.0",
        description = "User accounts with role-gated administration"
    )
)]
pub struct ApiDoc;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub account_service: Arc<AccountService>,
    pub policy: AuthorizationPolicy,
    pub tokens: Arc<TokenService>,
    pub audit: AuditRecorder,
    pub cookie_secure: bool,
    pub max_avatar_bytes: usize,
}

impl AppState {
    /// Wires the services over the given collaborators
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        audit_store: Arc<dyn AuditStore>,
        files: Arc<dyn FileStorage>,
        tokens: TokenService,
        cookie_secure: bool,
        max_avatar_bytes: usize,
    ) -> Self {
        let tokens = Arc::new(tokens);
        let passwords = PasswordService::new();
        let audit = AuditRecorder::new(audit_store);

        let auth_service = AuthService::new(accounts.clone(), passwords.clone(), tokens.clone());
        let account_service = AccountService::new(
            accounts.clone(),
            passwords,
            files,
            audit.clone(),
            max_avatar_bytes,
        );

        Self {
            auth_service: Arc::new(auth_service),
            account_service: Arc::new(account_service),
            policy: AuthorizationPolicy::new(accounts),
            tokens,
            audit,
            cookie_secure,
            max_avatar_bytes,
        }
    }
}

/// Creates and configures the application router
///
/// Routes are grouped by gate: public, authenticated, and admin. Mutations on
/// `/user/:id` additionally pass the self-or-admin check.
pub fn create_router(state: AppState, upload_dir: impl AsRef<Path>) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/refresh", post(auth::refresh_handler))
        .route("/logout", post(auth::logout_handler));

    let owner_only = put(accounts::update_account_handler)
        .delete(accounts::delete_account_handler)
        .route_layer(from_fn_with_state(state.clone(), auth::require_self_or_admin));

    let authenticated = Router::new()
        .route("/me", get(auth::me_handler))
        .route(
            "/me/avatar",
            post(accounts::upload_avatar_handler).layer(DefaultBodyLimit::max(
                state.max_avatar_bytes.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/users", get(accounts::list_accounts_handler))
        .route(
            "/user/:id",
            get(accounts::get_account_handler).merge(owner_only),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_auth));

    // route_layer wraps outward, so require_auth runs before require_admin
    let admin = Router::new()
        .route("/user", post(accounts::create_account_handler))
        .route("/user/:id/restore", post(accounts::restore_account_handler))
        .route("/users/export", get(accounts::export_accounts_handler))
        .route("/audit-logs", get(audit::list_audit_logs_handler))
        .route_layer(from_fn_with_state(state.clone(), auth::require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .nest_service(storage::PUBLIC_PREFIX, ServeDir::new(upload_dir))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;
