//! Audit action constants and helpers for workflow state transitions.
//!
//! Lives in `core` (no I/O) so the engine can tag its audit intents and the
//! storage layer can chain and redact the records it writes.

use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Action tags carried by workflow audit records.
pub mod action_types {
    pub const CREATE_WORKFLOW: &str = "create_workflow";
    pub const ADVANCE_WORKFLOW_STEP: &str = "advance_workflow_step";
    pub const ENTER_NEXT_STEP: &str = "enter_next_step";
    pub const COMPLETE_WORKFLOW: &str = "complete_workflow";
    pub const PAUSE_WORKFLOW: &str = "pause_workflow";
    pub const RESUME_WORKFLOW: &str = "resume_workflow";
    pub const CANCEL_WORKFLOW: &str = "cancel_workflow";
    pub const REJECT_WORKFLOW: &str = "reject_workflow";
    pub const REJECT_CANDIDATE: &str = "reject_candidate";
    pub const REJECT_RESIGNATION: &str = "reject_resignation";
    pub const REJECT_SALARY_ADJUSTMENT: &str = "reject_salary_adjustment";
    pub const CREATE_TEMPLATE: &str = "create_workflow_template";
}

/// Resource type recorded on every workflow instance audit record.
pub const RESOURCE_WORKFLOW_INSTANCE: &str = "workflow_instance";

/// Resource type recorded on template audit records.
pub const RESOURCE_WORKFLOW_TEMPLATE: &str = "workflow_template";

// ---------------------------------------------------------------------------
// Log category constants
// ---------------------------------------------------------------------------

/// Log categories used for retention policy grouping.
pub mod log_categories {
    pub const WORKFLOW: &str = "workflow";
    pub const TERMINATION: &str = "termination";
    pub const CONFIGURATION: &str = "configuration";
}

/// Map an action type to its log category.
///
/// Unknown action types default to `"workflow"`.
pub fn action_to_category(action_type: &str) -> &'static str {
    match action_type {
        action_types::CANCEL_WORKFLOW
        | action_types::REJECT_WORKFLOW
        | action_types::REJECT_CANDIDATE
        | action_types::REJECT_RESIGNATION
        | action_types::REJECT_SALARY_ADJUSTMENT => log_categories::TERMINATION,
        action_types::CREATE_TEMPLATE => log_categories::CONFIGURATION,
        _ => log_categories::WORKFLOW,
    }
}

// ---------------------------------------------------------------------------
// Integrity hash computation
// ---------------------------------------------------------------------------

/// Known seed value for the first entry in the hash chain.
const CHAIN_SEED: &str = "HRFLOW_AUDIT_CHAIN_SEED_V1";

/// Compute the SHA-256 integrity hash for an audit log entry.
///
/// `prev_hash` is the hash of the previous entry, or `None` for the first
/// entry in the chain. `entry_data` is the canonical JSON of the entry.
pub fn compute_integrity_hash(prev_hash: Option<&str>, entry_data: &str) -> String {
    let prev = prev_hash.unwrap_or(CHAIN_SEED);
    let digest = Sha256::digest(format!("{prev}|{entry_data}").as_bytes());
    format!("{digest:x}")
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Form fields that never reach the audit trail in clear text.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "bank_account",
    "id_number",
    "passport",
    "ssn",
];

/// Redact sensitive fields from a JSON value, recursing into nested objects.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_FIELDS.iter().any(|f| lower.contains(f)) {
                        (key.clone(), serde_json::Value::String("[REDACTED]".into()))
                    } else {
                        (key.clone(), redact_sensitive_fields(val))
                    }
                })
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
