// In-memory collaborators for tests; no database or filesystem required

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use chrono::Utc;

use crate::accounts::models::{Account, AccountState, NewAccount};
use crate::accounts::query::{AccountFilter, Pagination};
use crate::accounts::store::{AccountStore, StoreError, StoredPage, UniqueField, Visibility};
use crate::audit::models::{AuditLogEntry, NewAuditEntry};
use crate::audit::store::AuditStore;
use crate::auth::models::Role;
use crate::auth::password::PasswordService;
use crate::auth::token::TokenService;
use crate::storage::{FileStorage, StorageError, PUBLIC_PREFIX};
use crate::AppState;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes";
pub const TEST_MAX_AVATAR_BYTES: usize = 1024;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn visible(account: &Account, visibility: Visibility) -> bool {
    visibility == Visibility::IncludeDeleted || !account.state.is_deleted()
}

/// Same semantics as the SQL built by `AccountQueryBuilder`
fn matches(account: &Account, filter: &AccountFilter) -> bool {
    if !visible(account, filter.visibility) {
        return false;
    }
    if let Some(search) = &filter.search {
        if !contains_ci(&account.nickname, search) && !contains_ci(&account.email, search) {
            return false;
        }
    }
    if let Some(role) = &filter.role {
        if account.role.as_str() != role {
            return false;
        }
    }
    if let Some(email) = &filter.email {
        if !contains_ci(&account.email, email) {
            return false;
        }
    }
    if let Some(nickname) = &filter.nickname {
        if !contains_ci(&account.nickname, nickname) {
            return false;
        }
    }
    true
}

/// Account store backed by a Vec, enforcing the same unique constraints as Postgres
#[derive(Default)]
pub struct InMemoryAccountStore {
    rows: Mutex<Vec<Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniqueness holds over all rows, soft-deleted ones included
    fn check_unique(
        rows: &[Account],
        id: Option<i64>,
        nickname: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        for row in rows.iter().filter(|r| Some(r.id) != id) {
            if row.email == email {
                return Err(StoreError::UniqueViolation {
                    field: Some(UniqueField::Email),
                });
            }
            if row.nickname == nickname {
                return Err(StoreError::UniqueViolation {
                    field: Some(UniqueField::Nickname),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, id: i64, visibility: Visibility) -> Result<Option<Account>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|a| a.id == id && visible(a, visibility))
            .cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        visibility: Visibility,
    ) -> Result<Option<Account>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|a| a.email == email && visible(a, visibility))
            .cloned())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, None, &account.nickname, &account.email)?;

        let id = rows.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let account = Account {
            id,
            nickname: account.nickname,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            avatar_url: None,
            registered_at: Utc::now(),
            state: AccountState::Active,
        };
        rows.push(account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, Some(account.id), &account.nickname, &account.email)?;

        let row = rows
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or(StoreError::NotFound)?;
        // registration time is immutable
        let registered_at = row.registered_at;
        *row = Account {
            registered_at,
            ..account.clone()
        };
        Ok(row.clone())
    }

    async fn list(&self, filter: &AccountFilter, page: Pagination) -> Result<StoredPage, StoreError> {
        let all = self.list_all(filter).await?;
        let total = all.len() as i64;
        let accounts = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(StoredPage { accounts, total })
    }

    async fn list_all(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Account> = rows.iter().filter(|a| matches(a, filter)).cloned().collect();
        matching.sort_by_key(|a| a.id);
        Ok(matching)
    }
}

/// Audit store backed by a Vec; `failing()` rejects every append
#[derive(Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditLogEntry>>,
    failing: bool,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            failing: true,
        }
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, sqlx::Error> {
        if self.failing {
            return Err(sqlx::Error::PoolTimedOut);
        }

        let mut entries = self.entries.lock().unwrap();
        let saved = AuditLogEntry {
            id: entries.len() as i64 + 1,
            user_id: entry.user_id,
            action: entry.action,
            object: entry.object,
            object_id: entry.object_id,
            timestamp: entry.timestamp,
            ip: entry.ip,
            user_agent: entry.user_agent,
            metadata: entry.metadata,
        };
        entries.push(saved.clone());
        Ok(saved)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        let entries = self.entries.lock().unwrap();
        let mut newest_first = entries.clone();
        newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        newest_first.truncate(limit.max(0) as usize);
        Ok(newest_first)
    }
}

/// File storage backed by a map from public URL to bytes
#[derive(Default)]
pub struct InMemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.files.lock().unwrap().contains_key(url)
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let url = format!("{}/{}", PUBLIC_PREFIX, name);
        self.files
            .lock()
            .unwrap()
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        self.files
            .lock()
            .unwrap()
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| StorageError::Io(io::Error::new(io::ErrorKind::NotFound, url.to_string())))
    }
}

/// Fully wired state over in-memory collaborators
pub struct TestApp {
    pub state: AppState,
    pub accounts: Arc<InMemoryAccountStore>,
    pub audit: Arc<InMemoryAuditStore>,
    pub files: Arc<InMemoryFileStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let audit = Arc::new(InMemoryAuditStore::new());
        let files = Arc::new(InMemoryFileStorage::new());
        let state = AppState::new(
            accounts.clone(),
            audit.clone(),
            files.clone(),
            TokenService::new(TEST_SECRET),
            false,
            TEST_MAX_AVATAR_BYTES,
        );
        Self {
            state,
            accounts,
            audit,
            files,
        }
    }

    /// Inserts an admin directly into the store, the way an operator would
    pub async fn seed_admin(&self, nickname: &str, email: &str, password: &str) -> Account {
        let password_hash = PasswordService::new()
            .hash_password(password)
            .unwrap();
        self.accounts
            .insert(NewAccount {
                nickname: nickname.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::Admin,
            })
            .await
            .unwrap()
    }
}
