//! Append-only trail of state-changing actions (`audit_logs`).

use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditActive, state::AppState};

/// Writes one entry. Auditing never fails the request it describes.
pub async fn record(state: &AppState, user_id: Uuid, action: &str, resource: &str, metadata: Value) {
    let entry = AuditActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user_id)),
        action: Set(action.to_string()),
        resource: Set(Some(resource.to_string())),
        metadata: Set(Some(metadata)),
        created_at: NotSet,
    };

    if let Err(err) = entry.insert(&state.orm).await {
        tracing::warn!(error = %err, action, %user_id, "audit log failed");
    }
}
