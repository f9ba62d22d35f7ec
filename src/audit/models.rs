use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;

/// Actions recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CreateUser,
    UpdateUser,
    DeleteUser,
    UndeleteUser,
    UploadAvatar,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateUser => "create_user",
            AuditAction::UpdateUser => "update_user",
            AuditAction::DeleteUser => "delete_user",
            AuditAction::UndeleteUser => "undelete_user",
            AuditAction::UploadAvatar => "upload_avatar",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object type tag for account targets
pub const OBJECT_USER: &str = "user";

/// Who did it and from where; carried from the transport into the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditContext {
    pub actor_id: i64,
    pub ip: String,
    pub user_agent: String,
}

/// Entry to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: String,
    pub object: String,
    pub object_id: i64,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub metadata: String,
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub object: String,
    pub object_id: i64,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub metadata: String,
}

/// `{"logs": [...]}`
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogList {
    pub logs: Vec<AuditLogEntry>,
}
