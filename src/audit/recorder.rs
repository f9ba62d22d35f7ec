// Audit Recorder
//
// Appends audit entries for mutating account operations.
// Failures are logged but never propagated to the triggering operation.

use std::sync::Arc;

use chrono::Utc;

use crate::audit::models::{AuditAction, AuditContext, NewAuditEntry};
use crate::audit::store::AuditStore;

/// Best-effort audit trail writer
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    /// Record an action taken by `ctx.actor_id` on `object`/`object_id`
    ///
    /// Returns whether the entry was persisted; callers are free to ignore it.
    pub async fn record(
        &self,
        ctx: &AuditContext,
        action: AuditAction,
        object: &str,
        object_id: i64,
        metadata: impl Into<String>,
    ) -> bool {
        let entry = NewAuditEntry {
            user_id: ctx.actor_id,
            action: action.as_str().to_string(),
            object: object.to_string(),
            object_id,
            timestamp: Utc::now(),
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            metadata: metadata.into(),
        };

        match self.store.append(entry).await {
            Ok(saved) => {
                tracing::debug!(
                    "Audit entry {} recorded: {} {} {} by {}",
                    saved.id,
                    action,
                    object,
                    object_id,
                    ctx.actor_id
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    "Failed to write audit entry ({} {} {} by {}): {}",
                    action,
                    object,
                    object_id,
                    ctx.actor_id,
                    e
                );
                false
            }
        }
    }
}
