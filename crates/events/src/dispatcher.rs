//! Fire-and-forget delivery of engine intents.
//!
//! Intents are only dispatched after the transition that produced them has
//! been persisted. Delivery runs on a spawned task; failures are logged and
//! never roll the transition back.

use std::sync::Arc;

use hrflow_core::workflow::intent::{Intent, Transition};
use hrflow_core::workflow::sink::{AuditRecord, AuditSink, Notification, NotificationSink};
use tokio::task::JoinHandle;

use crate::bus::{EventBus, WorkflowEvent};

/// One concrete side effect derived from an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Audit(AuditRecord),
    Notify(Notification),
}

/// Materialise the deliveries for a persisted transition, in intent order.
///
/// Warning intents produce no delivery; they travel on the instance.
pub fn plan(transition: &Transition) -> Vec<Delivery> {
    let instance = &transition.instance;
    transition
        .intents
        .iter()
        .filter_map(|intent| match intent {
            Intent::Audit(audit) => Some(Delivery::Audit(AuditRecord::from_intent(audit, instance))),
            Intent::Notify(note) => Some(Delivery::Notify(Notification::from_intent(note, instance))),
            Intent::Warn(_) => None,
        })
        .collect()
}

pub struct IntentDispatcher {
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn NotificationSink>,
    bus: Arc<EventBus>,
}

impl IntentDispatcher {
    pub fn new(
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn NotificationSink>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            audit,
            notifier,
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Spawn delivery of `transition`'s intents and return immediately.
    ///
    /// The handle is only useful to tests; callers normally drop it.
    pub fn dispatch(&self, transition: &Transition) -> JoinHandle<()> {
        let deliveries = plan(transition);
        let audit = Arc::clone(&self.audit);
        let notifier = Arc::clone(&self.notifier);
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            deliver_all(audit.as_ref(), notifier.as_ref(), &bus, deliveries).await;
        })
    }

    /// Spawn delivery of an audit record that did not come from an instance
    /// transition (template changes).
    pub fn dispatch_audit(&self, record: AuditRecord) -> JoinHandle<()> {
        let audit = Arc::clone(&self.audit);
        let notifier = Arc::clone(&self.notifier);
        let bus = Arc::clone(&self.bus);
        tokio::spawn(async move {
            deliver_all(
                audit.as_ref(),
                notifier.as_ref(),
                &bus,
                vec![Delivery::Audit(record)],
            )
            .await;
        })
    }
}

/// Deliver sequentially so audit entries keep their chain order.
async fn deliver_all(
    audit: &dyn AuditSink,
    notifier: &dyn NotificationSink,
    bus: &EventBus,
    deliveries: Vec<Delivery>,
) {
    for delivery in deliveries {
        match delivery {
            Delivery::Audit(record) => {
                let event = WorkflowEvent::new(
                    format!("workflow.{}", record.action_type),
                    record.company_id,
                    record.resource_id,
                )
                .with_actor(record.actor_id)
                .with_payload(record.changes.clone());
                let action = record.action_type.clone();
                let instance_id = record.resource_id;

                if let Err(e) = audit.record(record).await {
                    tracing::error!(
                        error = %e,
                        action_type = %action,
                        instance_id,
                        "Failed to record audit entry"
                    );
                }
                bus.publish(event);
            }
            Delivery::Notify(notification) => {
                let recipient_id = notification.recipient_id;
                let instance_id = notification.workflow_instance_id;
                if let Err(e) = notifier.notify(notification).await {
                    tracing::warn!(
                        error = %e,
                        recipient_id,
                        instance_id,
                        "Failed to deliver notification"
                    );
                }
            }
        }
    }
}
