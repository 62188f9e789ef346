//! Side-effect intents emitted by the engine.
//!
//! The engine never performs I/O. Each operation returns the new instance
//! together with a list of intents; the caller persists the instance first and
//! only then hands the intents to the dispatcher. Intent delivery is
//! best-effort and never rolls back the transition.

use serde::{Deserialize, Serialize};

use crate::types::DbId;
use crate::workflow::instance::{Actor, WorkflowInstance};

/// Record one state transition in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIntent {
    pub action: String,
    pub actor: Actor,
    /// Before/after step ids and the fields the transition changed.
    pub changes: serde_json::Value,
}

/// Tell an actor that something needs their attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub recipient_id: DbId,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub step_id: Option<String>,
}

/// Non-fatal condition found while computing a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineWarning {
    /// A step became active but no candidate assignee could be found.
    UnresolvableAssignee {
        step_id: String,
        #[serde(default)]
        assignee_role: Option<String>,
    },
}

impl std::fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineWarning::UnresolvableAssignee {
                step_id,
                assignee_role,
            } => write!(
                f,
                "no assignee could be resolved for step '{step_id}' (role: {})",
                assignee_role.as_deref().unwrap_or("none")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    Audit(AuditIntent),
    Notify(NotificationIntent),
    Warn(EngineWarning),
}

/// Result of one engine operation.
#[derive(Debug, Clone)]
pub struct Transition {
    pub instance: WorkflowInstance,
    pub intents: Vec<Intent>,
}

impl Transition {
    pub fn audits(&self) -> impl Iterator<Item = &AuditIntent> {
        self.intents.iter().filter_map(|i| match i {
            Intent::Audit(a) => Some(a),
            _ => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = &NotificationIntent> {
        self.intents.iter().filter_map(|i| match i {
            Intent::Notify(n) => Some(n),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &EngineWarning> {
        self.intents.iter().filter_map(|i| match i {
            Intent::Warn(w) => Some(w),
            _ => None,
        })
    }

    /// Action tags of the audit intents, in emission order.
    pub fn audit_actions(&self) -> Vec<&str> {
        self.audits().map(|a| a.action.as_str()).collect()
    }
}
