// Append-only storage for audit entries

use axum::async_trait;
use sqlx::PgPool;

use crate::audit::models::{AuditLogEntry, NewAuditEntry};

/// Append-only audit log storage
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, sqlx::Error>;

    /// Newest entries first
    async fn recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>, sqlx::Error>;
}

/// Postgres-backed audit log
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, sqlx::Error> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            INSERT INTO audit_logs (user_id, action, object, object_id, timestamp, ip, user_agent, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, action, object, object_id, timestamp, ip, user_agent, metadata
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.object)
        .bind(entry.object_id)
        .bind(entry.timestamp)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, action, object, object_id, timestamp, ip, user_agent, metadata
            FROM audit_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
