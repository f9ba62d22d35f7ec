// Account lifecycle service - business logic layer
//
// Every mutation re-reads the current row, applies the change in memory and
// writes it back. There is no row locking; concurrent writers to the same
// account are last-write-wins.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::accounts::export::render_csv;
use crate::accounts::models::{
    Account, AccountListQuery, AccountPage, AccountState, CreateAccountRequest, NewAccount,
    UpdateAccountRequest,
};
use crate::accounts::query::{AccountFilter, Pagination};
use crate::accounts::store::{AccountStore, Visibility};
use crate::audit::models::{AuditAction, AuditContext, OBJECT_USER};
use crate::audit::recorder::AuditRecorder;
use crate::auth::password::PasswordService;
use crate::error::ApiError;
use crate::storage::FileStorage;
use crate::validation::normalize_email;

/// Accepted avatar file extensions
pub const AVATAR_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Lowercased extension of `filename` if it is an accepted image type
pub fn avatar_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    AVATAR_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Account Lifecycle Manager
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    password_service: PasswordService,
    files: Arc<dyn FileStorage>,
    audit: AuditRecorder,
    max_avatar_bytes: usize,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        password_service: PasswordService,
        files: Arc<dyn FileStorage>,
        audit: AuditRecorder,
        max_avatar_bytes: usize,
    ) -> Self {
        Self {
            store,
            password_service,
            files,
            audit,
            max_avatar_bytes,
        }
    }

    /// Active account by id
    pub async fn get(&self, id: i64) -> Result<Account, ApiError> {
        self.store
            .find_by_id(id, Visibility::ActiveOnly)
            .await?
            .ok_or_else(|| {
                debug!("Account {} not found", id);
                ApiError::account_not_found(id)
            })
    }

    /// Filtered, paginated listing; `include_deleted` is only honoured for admins
    pub async fn list(
        &self,
        query: &AccountListQuery,
        caller_is_admin: bool,
    ) -> Result<AccountPage, ApiError> {
        let filter = AccountFilter::from_query(query, caller_is_admin);
        let pagination = Pagination::normalize(query.page, query.limit);

        let page = self.store.list(&filter, pagination).await?;
        debug!(
            "Listed {} of {} accounts (page {}, limit {})",
            page.accounts.len(),
            page.total,
            pagination.page,
            pagination.limit
        );

        Ok(AccountPage {
            users: page.accounts.into_iter().map(Into::into).collect(),
            total: page.total,
            page: pagination.page,
            limit: pagination.limit,
        })
    }

    /// Admin create; the role defaults to `user`
    pub async fn create(
        &self,
        ctx: &AuditContext,
        request: CreateAccountRequest,
    ) -> Result<Account, ApiError> {
        request.validate()?;

        let password_hash = self.password_service.hash_password(&request.password)?;
        let account = self
            .store
            .insert(NewAccount {
                nickname: request.nickname.trim().to_string(),
                email: normalize_email(&request.email),
                password_hash,
                role: request.role.unwrap_or_default(),
            })
            .await?;

        info!("Account {} created by {}", account.id, ctx.actor_id);
        self.audit
            .record(ctx, AuditAction::CreateUser, OBJECT_USER, account.id, "")
            .await;
        Ok(account)
    }

    /// Applies only the fields present in `request`; a new password is re-hashed
    ///
    /// The caller must already have passed the self-or-admin check.
    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: i64,
        request: UpdateAccountRequest,
    ) -> Result<Account, ApiError> {
        request.validate()?;

        let mut account = self.get(id).await?;
        let changed = request.provided_fields();
        if changed.is_empty() {
            debug!("Empty update for account {}", id);
            return Ok(account);
        }

        if let Some(nickname) = request.nickname {
            account.nickname = nickname.trim().to_string();
        }
        if let Some(email) = request.email {
            account.email = normalize_email(&email);
        }
        if let Some(password) = request.password {
            account.password_hash = self.password_service.hash_password(&password)?;
        }

        let account = self.store.update(&account).await?;

        info!("Account {} updated by {}: {:?}", id, ctx.actor_id, changed);
        self.audit
            .record(ctx, AuditAction::UpdateUser, OBJECT_USER, id, changed.join(","))
            .await;
        Ok(account)
    }

    /// Marks an active account as deleted; the row stays in storage
    pub async fn soft_delete(&self, ctx: &AuditContext, id: i64) -> Result<(), ApiError> {
        let mut account = self.get(id).await?;
        account.state = AccountState::Deleted { at: Utc::now() };
        self.store.update(&account).await?;

        info!("Account {} deleted by {}", id, ctx.actor_id);
        self.audit
            .record(ctx, AuditAction::DeleteUser, OBJECT_USER, id, "")
            .await;
        Ok(())
    }

    /// Returns a soft-deleted account to the active state
    pub async fn restore(&self, ctx: &AuditContext, id: i64) -> Result<Account, ApiError> {
        let mut account = self
            .store
            .find_by_id(id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| ApiError::account_not_found(id))?;

        if !account.state.is_deleted() {
            return Err(ApiError::Conflict {
                message: "User is already active".to_string(),
            });
        }

        account.state = AccountState::Active;
        let account = self.store.update(&account).await?;

        info!("Account {} restored by {}", id, ctx.actor_id);
        self.audit
            .record(ctx, AuditAction::UndeleteUser, OBJECT_USER, id, "")
            .await;
        Ok(account)
    }

    /// CSV of every active account matching the list filters, unpaginated
    pub async fn export_csv(&self, query: &AccountListQuery) -> Result<String, ApiError> {
        let filter = AccountFilter::from_query(query, false);
        let accounts = self.store.list_all(&filter).await?;
        debug!("Exporting {} accounts", accounts.len());
        Ok(render_csv(&accounts))
    }

    /// Stores a new avatar for the acting account and drops the previous file
    pub async fn upload_avatar(
        &self,
        ctx: &AuditContext,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Account, ApiError> {
        let ext = avatar_extension(filename).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Unsupported file type, allowed: {}",
                AVATAR_EXTENSIONS.join(", ")
            ))
        })?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Avatar file is empty".to_string()));
        }
        if bytes.len() > self.max_avatar_bytes {
            return Err(ApiError::BadRequest(format!(
                "Avatar must not exceed {} bytes",
                self.max_avatar_bytes
            )));
        }

        let mut account = self.get(ctx.actor_id).await?;

        let name = format!("{}_{}.{}", account.id, Uuid::new_v4(), ext);
        let url = self.files.save(&name, bytes).await?;

        let previous = account.avatar_url.replace(url.clone());
        let account = match self.store.update(&account).await {
            Ok(account) => account,
            Err(e) => {
                if let Err(cleanup) = self.files.delete(&url).await {
                    warn!("Failed to remove orphaned avatar {}: {}", url, cleanup);
                }
                return Err(e.into());
            }
        };

        if let Some(previous) = previous {
            if let Err(e) = self.files.delete(&previous).await {
                warn!("Failed to delete previous avatar {}: {}", previous, e);
            }
        }

        info!("Account {} uploaded avatar {}", account.id, url);
        self.audit
            .record(ctx, AuditAction::UploadAvatar, OBJECT_USER, account.id, url)
            .await;
        Ok(account)
    }
}
