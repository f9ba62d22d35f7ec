// Authentication service - business logic layer

use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::accounts::models::{Account, NewAccount};
use crate::accounts::store::{AccountStore, StoreError, UniqueField, Visibility};
use crate::auth::{
    error::AuthError,
    models::{AccessTokenResponse, AuthResponse, LoginRequest, RegisterRequest, Role},
    password::PasswordService,
    token::{TokenKind, TokenService},
};
use crate::error::ApiError;
use crate::validation::normalize_email;

/// Authentication service coordinating registration, login and token renewal
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    password_service: PasswordService,
    token_service: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        password_service: PasswordService,
        token_service: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            password_service,
            token_service,
        }
    }

    /// Register a new account with role `user` and sign it in
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let nickname = request.nickname.trim().to_string();

        // Soft-deleted rows still reserve their email
        if self
            .store
            .find_by_email(&email, Visibility::IncludeDeleted)
            .await?
            .is_some()
        {
            warn!("Registration rejected, email already in use");
            return Err(StoreError::UniqueViolation {
                field: Some(UniqueField::Email),
            }
            .into());
        }

        let password_hash = self.password_service.hash_password(&request.password)?;

        // The unique constraints remain the authoritative guard against a concurrent insert
        let account = self
            .store
            .insert(NewAccount {
                nickname,
                email,
                password_hash,
                role: Role::User,
            })
            .await?;

        info!("Registered account {}", account.id);
        self.sign_in(account)
    }

    /// Exchange email and password for a token pair
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let account = self
            .store
            .find_by_email(&email, Visibility::ActiveOnly)
            .await?;

        let account = match account {
            Some(account)
                if self
                    .password_service
                    .verify_password(&request.password, &account.password_hash) =>
            {
                account
            }
            _ => {
                warn!("Failed login attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        info!("Account {} logged in", account.id);
        self.sign_in(account)
    }

    /// Issue a fresh access token from a refresh token
    ///
    /// The refresh token itself is neither rotated nor revoked.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<AccessTokenResponse, ApiError> {
        let account_id = self
            .token_service
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                warn!("Refresh rejected: {}", e);
                e
            })?;

        let access_token = self.token_service.issue_access(account_id)?;
        debug!("Issued access token for account {}", account_id);
        Ok(AccessTokenResponse { access_token })
    }

    /// Account bound to the current access token
    pub async fn current_user(&self, account_id: i64) -> Result<Account, ApiError> {
        self.store
            .find_by_id(account_id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| ApiError::account_not_found(account_id))
    }

    fn sign_in(&self, account: Account) -> Result<AuthResponse, ApiError> {
        let (access_token, refresh_token) = self.token_service.issue_pair(account.id)?;
        Ok(AuthResponse {
            user: account.into(),
            access_token,
            refresh_token,
        })
    }
}
