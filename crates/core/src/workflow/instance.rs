//! Workflow instances and their embedded step list.

use serde::{Deserialize, Serialize};

use crate::roles;
use crate::types::{DbId, JsonMap, Timestamp};
use crate::workflow::intent::EngineWarning;
use crate::workflow::status::{InstanceStatus, Priority, StepStatus, WorkflowType};
use crate::workflow::template::TemplateStep;

// ---------------------------------------------------------------------------
// Step metadata keys
// ---------------------------------------------------------------------------

pub const META_RESULT: &str = "result";
pub const META_COMMENTS: &str = "comments";
pub const META_FORM_DATA: &str = "form_data";
pub const META_ACTOR_ID: &str = "actor_id";
pub const META_ACTOR_NAME: &str = "actor_name";
pub const META_SKIPPED_REASON: &str = "skipped_reason";
pub const META_REJECTION_REASON: &str = "rejection_reason";
pub const META_CANCELLATION_REASON: &str = "cancellation_reason";

/// `skipped_reason` recorded when a step's condition evaluated to false.
pub const SKIP_CONDITION_NOT_MET: &str = "condition_not_met";

/// `skipped_reason` recorded when a terminal short-circuit closed the step.
pub const SKIP_TERMINATED: &str = "workflow_terminated";

// ---------------------------------------------------------------------------
// Actor / related entity
// ---------------------------------------------------------------------------

/// An already-authenticated user acting on a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: DbId, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
        }
    }
}

/// The business object a workflow concerns. Opaque to the engine apart from
/// being handed to the org lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub entity_id: DbId,
    #[serde(default)]
    pub entity_name: Option<String>,
}

// ---------------------------------------------------------------------------
// WorkflowStep
// ---------------------------------------------------------------------------

/// A step copied from the template, augmented with runtime fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub assignee_role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: StepStatus,
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    #[serde(default)]
    pub end_time: Option<Timestamp>,
    #[serde(default)]
    pub assignee_id: Option<DbId>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl WorkflowStep {
    /// Copy a template skeleton into a fresh `pending` step.
    ///
    /// Object-shaped template metadata seeds the step metadata.
    pub fn from_template(step: &TemplateStep) -> Self {
        let metadata = step
            .metadata
            .as_ref()
            .and_then(|m| m.as_object())
            .cloned()
            .unwrap_or_default();
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            assignee_role: step.assignee_role.clone(),
            description: step.description.clone(),
            status: StepStatus::Pending,
            start_time: None,
            end_time: None,
            assignee_id: None,
            metadata,
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub(crate) fn set_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// Whether `actor` may act on `step`.
///
/// Assignees and elevated roles may act; an unassigned step accepts anyone
/// holding the step's declared role.
pub fn can_act_on_step(step: &WorkflowStep, actor: &Actor) -> bool {
    if roles::is_elevated(&actor.role) {
        return true;
    }
    match step.assignee_id {
        Some(assignee) => assignee == actor.id,
        None => step
            .assignee_role
            .as_deref()
            .map_or(true, |role| role == actor.role),
    }
}

// ---------------------------------------------------------------------------
// WorkflowInstance
// ---------------------------------------------------------------------------

/// One running (or terminated) execution of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: DbId,
    pub company_id: DbId,
    pub template_id: DbId,
    pub template_name: String,
    pub template_version: i32,
    pub workflow_type: WorkflowType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: InstanceStatus,
    pub steps: Vec<WorkflowStep>,
    /// Index of the active step; `-1` before activation, `steps.len()` once terminal.
    pub current_step_index: i32,
    pub initiator_id: DbId,
    pub initiator_name: String,
    #[serde(default)]
    pub related_entity_type: Option<String>,
    #[serde(default)]
    pub related_entity_id: Option<DbId>,
    #[serde(default)]
    pub related_entity_name: Option<String>,
    #[serde(default)]
    pub form_data: JsonMap,
    #[serde(default)]
    pub variables: JsonMap,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Optimistic concurrency token; owned by the instance store.
    #[serde(default)]
    pub version: i64,
    /// Non-fatal findings from the most recent transition.
    #[serde(default)]
    pub warnings: Vec<EngineWarning>,
}

impl WorkflowInstance {
    /// The step at `current_step_index`, if the index is in range.
    pub fn current_step(&self) -> Option<&WorkflowStep> {
        usize::try_from(self.current_step_index)
            .ok()
            .and_then(|i| self.steps.get(i))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn related_entity(&self) -> Option<RelatedEntity> {
        match (&self.related_entity_type, self.related_entity_id) {
            (Some(entity_type), Some(entity_id)) => Some(RelatedEntity {
                entity_type: entity_type.clone(),
                entity_id,
                entity_name: self.related_entity_name.clone(),
            }),
            _ => None,
        }
    }

    /// Check the step-list invariants for the current status.
    ///
    /// - active: at most one `in_progress` step, located at
    ///   `current_step_index`; earlier steps closed; later steps pending
    /// - completed / cancelled: no `pending` or `in_progress` steps left
    /// - draft: every step pending
    pub fn check_invariants(&self) -> Result<(), String> {
        let in_progress = self.count_steps(StepStatus::InProgress);
        match self.status {
            InstanceStatus::Draft => {
                if self.steps.iter().any(|s| s.status != StepStatus::Pending) {
                    return Err("draft instance has non-pending steps".into());
                }
            }
            InstanceStatus::Active | InstanceStatus::Paused => {
                if in_progress > 1 {
                    return Err(format!("{in_progress} steps are in progress"));
                }
                let current = usize::try_from(self.current_step_index)
                    .ok()
                    .filter(|i| *i < self.steps.len())
                    .ok_or_else(|| {
                        format!(
                            "current_step_index {} out of range for a live instance",
                            self.current_step_index
                        )
                    })?;
                for (i, step) in self.steps.iter().enumerate() {
                    let ok = match i.cmp(&current) {
                        std::cmp::Ordering::Less => step.status.is_closed(),
                        std::cmp::Ordering::Equal => {
                            matches!(step.status, StepStatus::InProgress | StepStatus::Completed)
                        }
                        std::cmp::Ordering::Greater => step.status == StepStatus::Pending,
                    };
                    if !ok {
                        return Err(format!(
                            "step '{}' at index {i} is {} relative to current index {current}",
                            step.id,
                            step.status.as_str()
                        ));
                    }
                }
            }
            InstanceStatus::Completed | InstanceStatus::Cancelled => {
                if let Some(open) = self.steps.iter().find(|s| !s.status.is_closed()) {
                    return Err(format!(
                        "terminal instance still has step '{}' {}",
                        open.id,
                        open.status.as_str()
                    ));
                }
            }
        }
        Ok(())
    }
}
