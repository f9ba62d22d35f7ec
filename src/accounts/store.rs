// Storage abstraction for account rows

use axum::async_trait;
use thiserror::Error;

use crate::accounts::models::{Account, NewAccount};
use crate::accounts::query::{AccountFilter, Pagination};
use crate::error::ApiError;

/// Whether soft-deleted rows are visible to a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ActiveOnly,
    IncludeDeleted,
}

/// Column guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Nickname,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Email => "email",
            UniqueField::Nickname => "nickname",
        }
    }
}

fn field_name(field: &Option<UniqueField>) -> &'static str {
    field.map(|f| f.as_str()).unwrap_or("unknown field")
}

/// Store failures, decoupled from any specific driver's error codes
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write collided with an existing value on a unique column.
    /// `None` when the backend could not tell which column.
    #[error("unique constraint violated on {}", field_name(.field))]
    UniqueViolation { field: Option<UniqueField> },

    /// The targeted row does not exist
    #[error("row not found")]
    NotFound,

    /// A stored row could not be mapped to the domain model
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field } => ApiError::Conflict {
                message: match field {
                    Some(UniqueField::Email) => "Email is already in use".to_string(),
                    Some(UniqueField::Nickname) => "Nickname is already in use".to_string(),
                    None => "User with this email or nickname already exists".to_string(),
                },
            },
            StoreError::NotFound => ApiError::NotFound {
                resource: "User".to_string(),
                id: "unknown".to_string(),
            },
            StoreError::Corrupt(msg) => ApiError::InternalError(msg),
            StoreError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

/// A page of rows plus the total number of matches
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub accounts: Vec<Account>,
    pub total: i64,
}

/// Relational store for accounts
///
/// Every lookup takes an explicit `Visibility`; there is no implicit
/// soft-delete scope.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: i64, visibility: Visibility) -> Result<Option<Account>, StoreError>;

    /// `email` is expected to be normalized already
    async fn find_by_email(
        &self,
        email: &str,
        visibility: Visibility,
    ) -> Result<Option<Account>, StoreError>;

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Writes every mutable column of `account`, including its state
    async fn update(&self, account: &Account) -> Result<Account, StoreError>;

    async fn list(&self, filter: &AccountFilter, page: Pagination) -> Result<StoredPage, StoreError>;

    /// All matching rows, unpaginated, ordered by id
    async fn list_all(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError>;
}
