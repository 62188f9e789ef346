//! Template-driven workflow engine.
//!
//! Templates define an ordered list of steps with optional activation
//! conditions; instances are the running copies. All state changes go
//! through [`engine`], which returns the new instance together with the
//! audit/notification intents to dispatch once the change is persisted.

pub mod assignee;
pub mod command;
pub mod condition;
pub mod engine;
pub mod instance;
pub mod intent;
pub mod registry;
pub mod sink;
pub mod status;
pub mod store;
pub mod template;

pub use assignee::{NoOrgLookup, OrgLookup, OrgSnapshot, OrgSource, StaticOrgSource};
pub use command::AdvanceCommand;
pub use condition::{ConditionOperator, StepCondition};
pub use engine::{EngineConfig, HoldMode, NewInstance};
pub use instance::{Actor, RelatedEntity, WorkflowInstance, WorkflowStep};
pub use intent::{AuditIntent, EngineWarning, Intent, NotificationIntent, Transition};
pub use registry::TemplateRegistry;
pub use sink::{AuditRecord, AuditSink, Notification, NotificationSink};
pub use status::{InstanceStatus, Priority, StepStatus, WorkflowType};
pub use store::{InstanceStore, TemplateStore, DEFAULT_MAX_SAVE_ATTEMPTS};
pub use template::{TemplateStep, WorkflowTemplate};
