//! Notification channel that only writes to the trace log.
//!
//! Used when no webhook endpoint is configured.

use async_trait::async_trait;
use hrflow_core::error::CoreError;
use hrflow_core::workflow::sink::{Notification, NotificationSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        tracing::info!(
            recipient_id = notification.recipient_id,
            instance_id = notification.workflow_instance_id,
            step_id = ?notification.step_id,
            title = %notification.title,
            "Notification"
        );
        Ok(())
    }
}
