use crate::accounts::models::AccountListQuery;
use crate::accounts::store::Visibility;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Normalized account filter
/// Empty strings are dropped; all text filters are case-insensitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    /// Partial match on nickname OR email
    pub search: Option<String>,
    /// Exact role match
    pub role: Option<String>,
    /// Partial email match
    pub email: Option<String>,
    /// Partial nickname match
    pub nickname: Option<String>,
    pub visibility: Visibility,
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            email: None,
            nickname: None,
            visibility: Visibility::ActiveOnly,
        }
    }
}

impl AccountFilter {
    /// Builds a filter from request parameters
    ///
    /// `allow_deleted` gates the `include_deleted` flag; callers that may not
    /// see soft-deleted rows always get `ActiveOnly`.
    pub fn from_query(query: &AccountListQuery, allow_deleted: bool) -> Self {
        let visibility = if allow_deleted && query.include_deleted.unwrap_or(false) {
            Visibility::IncludeDeleted
        } else {
            Visibility::ActiveOnly
        };

        Self {
            search: normalize_string(query.search.as_deref()),
            role: normalize_string(query.role.as_deref()).map(|r| r.to_lowercase()),
            email: normalize_string(query.email.as_deref()),
            nickname: normalize_string(query.nickname.as_deref()),
            visibility,
        }
    }
}

/// Trims input, returning None for empty strings
fn normalize_string(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validated pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Out-of-range values fall back to defaults: page < 1 becomes 1,
    /// a limit outside 1..=100 becomes 10
    pub fn normalize(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 && p <= u32::MAX as i64 => p as u32,
            _ => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(l) if l >= 1 && l <= MAX_LIMIT as i64 => l as u32,
            _ => DEFAULT_LIMIT,
        };
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// SQL query builder for constructing parameterized account queries
/// Builds matching SELECT and COUNT statements that share one WHERE clause
pub struct AccountQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<String>,
    pagination: Option<Pagination>,
}

pub const ACCOUNT_COLUMNS: &str =
    "id, nickname, email, password_hash, role, avatar_url, registered_at, deleted_at";

impl AccountQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
            pagination: None,
        }
    }

    /// Builder preloaded with every clause the filter implies
    pub fn from_filter(filter: &AccountFilter) -> Self {
        let mut builder = Self::new();
        builder.set_visibility(filter.visibility);
        if let Some(search) = &filter.search {
            builder.add_search_filter(search);
        }
        if let Some(role) = &filter.role {
            builder.add_role_filter(role);
        }
        if let Some(email) = &filter.email {
            builder.add_email_filter(email);
        }
        if let Some(nickname) = &filter.nickname {
            builder.add_nickname_filter(nickname);
        }
        builder
    }

    fn next_param(&mut self, value: String) -> usize {
        self.params.push(value);
        self.params.len()
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        if visibility == Visibility::ActiveOnly {
            self.where_clauses.push("deleted_at IS NULL".to_string());
        }
    }

    /// Partial match on nickname or email (case-insensitive)
    pub fn add_search_filter(&mut self, search: &str) {
        let idx = self.next_param(format!("%{}%", escape_like(search)));
        self.where_clauses
            .push(format!("(nickname ILIKE ${0} OR email ILIKE ${0})", idx));
    }

    pub fn add_role_filter(&mut self, role: &str) {
        let idx = self.next_param(role.to_string());
        self.where_clauses.push(format!("role = ${}", idx));
    }

    pub fn add_email_filter(&mut self, email: &str) {
        let idx = self.next_param(format!("%{}%", escape_like(email)));
        self.where_clauses.push(format!("email ILIKE ${}", idx));
    }

    pub fn add_nickname_filter(&mut self, nickname: &str) {
        let idx = self.next_param(format!("%{}%", escape_like(nickname)));
        self.where_clauses.push(format!("nickname ILIKE ${}", idx));
    }

    pub fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = Some(pagination);
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// SELECT ordered by id, with LIMIT/OFFSET when paginated
    pub fn build_select(&self) -> (String, Vec<String>) {
        let mut query = format!("SELECT {} FROM users{} ORDER BY id", ACCOUNT_COLUMNS, self.where_sql());

        // LIMIT/OFFSET are inlined; PostgreSQL wants integers, not bound text
        if let Some(p) = self.pagination {
            query.push_str(&format!(" LIMIT {} OFFSET {}", p.limit, p.offset()));
        }

        (query, self.params.clone())
    }

    pub fn build_count(&self) -> (String, Vec<String>) {
        (
            format!("SELECT COUNT(*) FROM users{}", self.where_sql()),
            self.params.clone(),
        )
    }
}

impl Default for AccountQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
