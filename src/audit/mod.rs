// Audit trail module
// Append-only log of mutating account operations

pub mod handlers;
pub mod models;
pub mod recorder;
pub mod store;

pub use handlers::list_audit_logs_handler;
pub use models::{AuditAction, AuditContext, AuditLogEntry, OBJECT_USER};
pub use recorder::AuditRecorder;
pub use store::{AuditStore, PgAuditStore};
