// Postgres-backed account store

use axum::async_trait;
use sqlx::PgPool;

use crate::accounts::models::{Account, AccountRow, NewAccount};
use crate::accounts::query::{AccountFilter, AccountQueryBuilder, Pagination, ACCOUNT_COLUMNS};
use crate::accounts::store::{AccountStore, StoreError, StoredPage, UniqueField, Visibility};

const EMAIL_CONSTRAINT: &str = "users_email_key";
const NICKNAME_CONSTRAINT: &str = "users_nickname_key";

/// Account repository for database operations
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new PgAccountStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates a driver error into a typed store error
///
/// Unique violations are identified by constraint name so the caller learns
/// which column collided.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => Some(UniqueField::Email),
                Some(NICKNAME_CONSTRAINT) => Some(UniqueField::Nickname),
                _ => None,
            };
            return StoreError::UniqueViolation { field };
        }
    }
    StoreError::Database(e)
}

fn into_account(row: AccountRow) -> Result<Account, StoreError> {
    Account::try_from(row).map_err(StoreError::Corrupt)
}

fn visibility_clause(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::ActiveOnly => " AND deleted_at IS NULL",
        Visibility::IncludeDeleted => "",
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: i64, visibility: Visibility) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE id = $1{}",
            ACCOUNT_COLUMNS,
            visibility_clause(visibility)
        );

        sqlx::query_as::<_, AccountRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_account)
            .transpose()
    }

    async fn find_by_email(
        &self,
        email: &str,
        visibility: Visibility,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE email = $1{}",
            ACCOUNT_COLUMNS,
            visibility_clause(visibility)
        );

        sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(into_account)
            .transpose()
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (nickname, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(&account.nickname)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        into_account(row)
    }

    async fn update(&self, account: &Account) -> Result<Account, StoreError> {
        let query = format!(
            r#"
            UPDATE users
            SET nickname = $1,
                email = $2,
                password_hash = $3,
                role = $4,
                avatar_url = $5,
                deleted_at = $6
            WHERE id = $7
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(&account.nickname)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(&account.avatar_url)
            .bind(account.state.deleted_at())
            .bind(account.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(StoreError::NotFound)?;

        into_account(row)
    }

    async fn list(&self, filter: &AccountFilter, page: Pagination) -> Result<StoredPage, StoreError> {
        let mut builder = AccountQueryBuilder::from_filter(filter);

        let (count_sql, count_params) = builder.build_count();
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in count_params {
            count_query = count_query.bind(param);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        builder.set_pagination(page);
        let (select_sql, params) = builder.build_select();
        let mut select_query = sqlx::query_as::<_, AccountRow>(&select_sql);
        for param in params {
            select_query = select_query.bind(param);
        }
        let rows = select_query.fetch_all(&self.pool).await?;

        let accounts = rows
            .into_iter()
            .map(into_account)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredPage { accounts, total })
    }

    async fn list_all(&self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let (select_sql, params) = AccountQueryBuilder::from_filter(filter).build_select();
        let mut select_query = sqlx::query_as::<_, AccountRow>(&select_sql);
        for param in params {
            select_query = select_query.bind(param);
        }

        select_query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(into_account)
            .collect()
    }
}
