//! Audit log rows. Immutable once written (no `updated_at`).

use hrflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub company_id: DbId,
    pub actor_id: DbId,
    pub actor_name: String,
    pub actor_role: String,
    pub action_type: String,
    pub log_category: String,
    pub resource_type: String,
    pub resource_id: DbId,
    pub changes: serde_json::Value,
    pub integrity_hash: String,
    pub created_at: Timestamp,
}

impl AuditLog {
    /// Canonical text covered by the integrity hash.
    ///
    /// Timestamps are reduced to microseconds, the precision PostgreSQL keeps.
    pub fn canonical_entry(
        company_id: DbId,
        actor_id: DbId,
        action_type: &str,
        resource_type: &str,
        resource_id: DbId,
        changes: &serde_json::Value,
        created_at: Timestamp,
    ) -> String {
        serde_json::json!({
            "company_id": company_id,
            "actor_id": actor_id,
            "action_type": action_type,
            "resource_type": resource_type,
            "resource_id": resource_id,
            "changes": changes,
            "created_at_us": created_at.timestamp_micros(),
        })
        .to_string()
    }

    pub fn canonical(&self) -> String {
        Self::canonical_entry(
            self.company_id,
            self.actor_id,
            &self.action_type,
            &self.resource_type,
            self.resource_id,
            &self.changes,
            self.created_at,
        )
    }
}
