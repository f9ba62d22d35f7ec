// HTTP handler for the audit log

use axum::extract::State;

use crate::audit::models::AuditLogList;
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

/// Number of entries returned by the audit log endpoint
pub const AUDIT_LOG_LIMIT: i64 = 100;

/// Handler for GET /audit-logs
/// Admin only; newest entries first
#[utoipa::path(
    get,
    path = "/audit-logs",
    responses(
        (status = 200, description = "Latest audit entries", body = AuditLogList),
        (status = 403, description = "Admin role required")
    ),
    tag = "admin"
)]
pub async fn list_audit_logs_handler(State(state): State<AppState>) -> ApiResult<AuditLogList> {
    let logs = state.audit.store().recent(AUDIT_LOG_LIMIT).await?;
    tracing::debug!("Returning {} audit entries", logs.len());
    Ok(ApiResponse::ok(AuditLogList { logs }))
}
