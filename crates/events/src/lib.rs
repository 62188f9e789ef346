//! Side-effect delivery for the workflow platform.
//!
//! - [`IntentDispatcher`] turns the intents of a persisted transition into
//!   audit records and notifications and delivers them in the background.
//! - [`EventBus`] fans out a [`WorkflowEvent`] per dispatched audit entry to
//!   in-process subscribers.
//! - [`delivery`] holds the notification channels (IM bot webhook, log).

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{EventBus, EventLogger, WorkflowEvent};
pub use delivery::log::LogNotifier;
pub use delivery::webhook::{WebhookError, WebhookNotifier};
pub use dispatcher::{plan, Delivery, IntentDispatcher};
