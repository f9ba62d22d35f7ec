// Authorization policy
//
// Role is not carried in the access token; every decision re-reads the
// acting account so a demotion or deletion takes effect immediately.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::accounts::models::Account;
use crate::accounts::store::{AccountStore, Visibility};
use crate::auth::error::AuthError;
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::models::Role;
use crate::error::ApiError;
use crate::validation::parse_account_id;
use crate::AppState;

/// Permission decisions over the account store
#[derive(Clone)]
pub struct AuthorizationPolicy {
    store: Arc<dyn AccountStore>,
}

impl AuthorizationPolicy {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Loads the acting account; a missing or soft-deleted account fails closed
    async fn acting_account(&self, acting_id: i64) -> Result<Account, ApiError> {
        self.store
            .find_by_id(acting_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| {
                warn!("Acting account {} no longer available", acting_id);
                AuthError::AccountUnavailable.into()
            })
    }

    /// Allows the owner of `target_id` or any admin. Returns the acting account.
    pub async fn self_or_admin(&self, acting_id: i64, target_id: i64) -> Result<Account, ApiError> {
        let acting = self.acting_account(acting_id).await?;

        if acting.id == target_id || acting.is_admin() {
            debug!(
                "self_or_admin allowed: acting={}, target={}, role={}",
                acting_id, target_id, acting.role
            );
            return Ok(acting);
        }

        warn!(
            "self_or_admin denied: acting={}, target={}, role={}",
            acting_id, target_id, acting.role
        );
        Err(AuthError::NotOwner { target: target_id }.into())
    }

    /// Allows admins only. Returns the acting account.
    pub async fn admin_only(&self, acting_id: i64) -> Result<Account, ApiError> {
        let acting = self.acting_account(acting_id).await?;

        if acting.is_admin() {
            return Ok(acting);
        }

        warn!(
            "admin_only denied: acting={}, role={}",
            acting_id, acting.role
        );
        Err(AuthError::InsufficientPermissions {
            required: Role::Admin,
            actual: acting.role,
        }
        .into())
    }

    /// Current role of the acting account, failing closed like the rules above
    pub async fn role_of(&self, acting_id: i64) -> Result<Role, ApiError> {
        Ok(self.acting_account(acting_id).await?.role)
    }
}

/// Route layer for admin-only routes; must run inside `require_auth`
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&request)?;
    state.policy.admin_only(user.user_id).await?;
    Ok(next.run(request).await)
}

/// Route layer for `/user/:id` mutations; must run inside `require_auth`
pub async fn require_self_or_admin(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&request)?;
    let target_id = parse_account_id(&raw_id)
        .ok_or_else(|| ApiError::BadRequest("Invalid user id".to_string()))?;

    state.policy.self_or_admin(user.user_id, target_id).await?;
    Ok(next.run(request).await)
}

fn current_user(request: &Request<Body>) -> Result<AuthenticatedUser, ApiError> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| AuthError::MissingToken.into())
}
