// Account domain model, row mapping and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::models::Role;

/// Lifecycle state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl AccountState {
    pub fn is_deleted(&self) -> bool {
        matches!(self, AccountState::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AccountState::Active => None,
            AccountState::Deleted { at } => Some(*at),
        }
    }
}

/// Account domain model
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub state: AccountState,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Raw `users` row as stored in Postgres
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<AccountRow> for Account {
    type Error = String;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>()?;
        let state = match row.deleted_at {
            Some(at) => AccountState::Deleted { at },
            None => AccountState::Active,
        };

        Ok(Self {
            id: row.id,
            nickname: row.nickname,
            email: row.email,
            password_hash: row.password_hash,
            role,
            avatar_url: row.avatar_url,
            registered_at: row.registered_at,
            state,
        })
    }
}

/// Values for inserting a new account; the store assigns id and registration time
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub nickname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Outward account representation (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AccountView {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "alice")]
    pub nickname: String,
    #[schema(example = "a@x.com")]
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            nickname: account.nickname,
            email: account.email,
            role: account.role,
            avatar_url: account.avatar_url,
            registered_at: account.registered_at,
            deleted_at: account.state.deleted_at(),
        }
    }
}

/// Admin create-account request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(custom = "crate::validation::validate_nickname")]
    pub nickname: String,
    #[validate(
        email(message = "Must be a valid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,
    /// Defaults to `user`
    pub role: Option<Role>,
}

/// Partial profile update; omitted fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    #[validate(custom = "crate::validation::validate_nickname")]
    pub nickname: Option<String>,
    #[validate(
        email(message = "Must be a valid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
}

impl UpdateAccountRequest {
    /// Names of the fields present in the request, in declaration order
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.nickname.is_some() {
            fields.push("nickname");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.password.is_some() {
            fields.push("password");
        }
        fields
    }
}

/// Query parameters for list-accounts and export
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountListQuery {
    /// Case-insensitive match on nickname or email
    pub search: Option<String>,
    /// Exact role filter
    pub role: Option<String>,
    /// Case-insensitive partial email match
    pub email: Option<String>,
    /// Case-insensitive partial nickname match
    pub nickname: Option<String>,
    /// Page number, 1-indexed
    pub page: Option<i64>,
    /// Items per page, 1..=100
    pub limit: Option<i64>,
    /// Include soft-deleted accounts (admins only)
    pub include_deleted: Option<bool>,
}

/// One page of accounts
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountPage {
    pub users: Vec<AccountView>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Wrapper for single-account payloads: `{"user": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountEnvelope {
    pub user: AccountView,
}

impl From<Account> for AccountEnvelope {
    fn from(account: Account) -> Self {
        Self {
            user: account.into(),
        }
    }
}
