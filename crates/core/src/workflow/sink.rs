//! Side-effect sinks and the records they receive.
//!
//! Engine intents carry only what the engine knows; [`AuditRecord`] and
//! [`Notification`] add the persisted instance context (id, company) once
//! the transition has been saved.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::audit::{action_to_category, redact_sensitive_fields, RESOURCE_WORKFLOW_INSTANCE};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::workflow::instance::WorkflowInstance;
use crate::workflow::intent::{AuditIntent, NotificationIntent};

/// One append-only audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub company_id: DbId,
    pub actor_id: DbId,
    pub actor_name: String,
    pub actor_role: String,
    pub action_type: String,
    pub category: String,
    pub resource_type: String,
    pub resource_id: DbId,
    /// Change payload with sensitive fields redacted.
    pub changes: serde_json::Value,
    pub created_at: Timestamp,
}

impl AuditRecord {
    pub fn from_intent(intent: &AuditIntent, instance: &WorkflowInstance) -> Self {
        Self {
            company_id: instance.company_id,
            actor_id: intent.actor.id,
            actor_name: intent.actor.name.clone(),
            actor_role: intent.actor.role.clone(),
            action_type: intent.action.clone(),
            category: action_to_category(&intent.action).to_string(),
            resource_type: RESOURCE_WORKFLOW_INSTANCE.to_string(),
            resource_id: instance.id,
            changes: redact_sensitive_fields(&intent.changes),
            created_at: Utc::now(),
        }
    }
}

/// A message for one recipient about one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub company_id: DbId,
    pub recipient_id: DbId,
    pub title: String,
    pub body: String,
    pub workflow_instance_id: DbId,
    pub workflow_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl Notification {
    pub fn from_intent(intent: &NotificationIntent, instance: &WorkflowInstance) -> Self {
        Self {
            company_id: instance.company_id,
            recipient_id: intent.recipient_id,
            title: intent.title.clone(),
            body: intent.body.clone(),
            workflow_instance_id: instance.id,
            workflow_name: instance.name.clone(),
            step_id: intent.step_id.clone(),
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), CoreError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), CoreError>;
}

/// Keeps every record in memory. Used by tests and local development.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), CoreError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{action_types, log_categories};
    use crate::workflow::assignee::NoOrgLookup;
    use crate::workflow::engine::{create_instance, NewInstance};
    use crate::workflow::instance::Actor;
    use crate::workflow::template::fixtures::linear_template;
    use serde_json::json;

    fn persisted() -> WorkflowInstance {
        let mut inst = create_instance(
            &linear_template(&["a"]),
            NewInstance::new(Actor::new(1, "Hana", "hr")),
            &NoOrgLookup,
        )
        .unwrap()
        .instance;
        inst.id = 31;
        inst
    }

    #[test]
    fn audit_record_takes_instance_context_and_redacts() {
        let intent = AuditIntent {
            action: action_types::REJECT_SALARY_ADJUSTMENT.into(),
            actor: Actor::new(2, "Ravi", "hr_admin"),
            changes: json!({"reason": "over budget", "bank_account": "NO93 8601 1117 947"}),
        };
        let record = AuditRecord::from_intent(&intent, &persisted());
        assert_eq!(record.resource_id, 31);
        assert_eq!(record.company_id, 1);
        assert_eq!(record.category, log_categories::TERMINATION);
        assert_eq!(record.changes["reason"], "over budget");
        assert_ne!(record.changes["bank_account"], "NO93 8601 1117 947");
    }

    #[tokio::test]
    async fn memory_sinks_collect_in_order() {
        let inst = persisted();
        let sink = MemoryNotificationSink::new();
        for recipient_id in [5, 6] {
            let intent = NotificationIntent {
                recipient_id,
                title: "t".into(),
                body: "b".into(),
                step_id: None,
            };
            sink.notify(Notification::from_intent(&intent, &inst))
                .await
                .unwrap();
        }
        let sent = sink.sent().await;
        assert_eq!(sent.iter().map(|n| n.recipient_id).collect::<Vec<_>>(), vec![5, 6]);
        assert_eq!(sent[0].workflow_instance_id, 31);
    }
}
