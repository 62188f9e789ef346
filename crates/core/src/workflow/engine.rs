//! Step advancement engine.
//!
//! The sole authority for mutating an instance's `steps`, `status` and
//! `current_step_index`. Every operation is a pure function of
//! `(template, instance, input)`: it clones the instance, applies the
//! transition and returns a [`Transition`] holding the new state and the
//! intents the caller must dispatch after persisting it. On error the input
//! instance is untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::action_types;
use crate::error::CoreError;
use crate::types::{DbId, JsonMap, Timestamp};
use crate::workflow::assignee::{resolve_assignee, OrgLookup};
use crate::workflow::command::AdvanceCommand;
use crate::workflow::condition::evaluate_condition;
use crate::workflow::instance::{
    Actor, RelatedEntity, WorkflowInstance, WorkflowStep, META_ACTOR_ID, META_ACTOR_NAME,
    META_CANCELLATION_REASON, META_COMMENTS, META_FORM_DATA, META_REJECTION_REASON, META_RESULT,
    META_SKIPPED_REASON, SKIP_CONDITION_NOT_MET, SKIP_TERMINATED,
};
use crate::workflow::intent::{AuditIntent, EngineWarning, Intent, NotificationIntent, Transition};
use crate::workflow::status::{InstanceStatus, Priority, StepStatus};
use crate::workflow::template::{validate_template, WorkflowTemplate};

/// Result tag written on the active step when an instance is rejected.
pub const RESULT_REJECTED: &str = "rejected";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What `advance_to_next = false` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldMode {
    /// Persist the half-state: the step is completed, nothing is in progress,
    /// and the instance waits for [`enter_next_step`].
    #[default]
    AwaitEnterNext,
    /// Ignore the flag and activate the next eligible step right away.
    AdvanceImmediately,
}

impl HoldMode {
    pub fn from_str_config(s: &str) -> Result<Self, CoreError> {
        match s {
            "await_enter_next" => Ok(Self::AwaitEnterNext),
            "advance_immediately" => Ok(Self::AdvanceImmediately),
            _ => Err(CoreError::Validation(format!(
                "Invalid hold mode '{s}'. Must be one of: await_enter_next, advance_immediately"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitEnterNext => "await_enter_next",
            Self::AdvanceImmediately => "advance_immediately",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub hold_mode: HoldMode,
}

// ---------------------------------------------------------------------------
// Instantiation input
// ---------------------------------------------------------------------------

/// Everything needed to start an instance besides the template.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub initiator: Actor,
    /// Owning company; defaults to the template's. Set when starting from a
    /// public template of another company.
    pub company_id: Option<DbId>,
    pub related_entity: Option<RelatedEntity>,
    pub initial_form_data: JsonMap,
    pub variables: JsonMap,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<Timestamp>,
    /// Create as `draft` with every step pending; activated on first advancement.
    pub as_draft: bool,
}

impl NewInstance {
    pub fn new(initiator: Actor) -> Self {
        Self {
            initiator,
            company_id: None,
            related_entity: None,
            initial_form_data: JsonMap::new(),
            variables: JsonMap::new(),
            name: None,
            description: None,
            priority: Priority::default(),
            due_date: None,
            as_draft: false,
        }
    }

    pub fn for_company(mut self, company_id: DbId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_related_entity(mut self, entity: RelatedEntity) -> Self {
        self.related_entity = Some(entity);
        self
    }

    pub fn with_form_data(mut self, form_data: JsonMap) -> Self {
        self.initial_form_data = form_data;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn draft(mut self) -> Self {
        self.as_draft = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Forward scan
// ---------------------------------------------------------------------------

/// Outcome of scanning forward for the next eligible step.
struct Scan {
    activated: Option<usize>,
    skipped: Vec<String>,
}

/// Skip ineligible steps from `from` onwards and activate the first eligible
/// one. Completes the instance when the end of the list is reached.
///
/// Notification and warning intents for the activated step are pushed onto
/// `intents`.
fn activate_next(
    template: &WorkflowTemplate,
    inst: &mut WorkflowInstance,
    from: usize,
    org: &dyn OrgLookup,
    now: Timestamp,
    intents: &mut Vec<Intent>,
) -> Scan {
    let mut skipped = Vec::new();

    for index in from..inst.steps.len() {
        let eligible = template
            .condition_for(&inst.steps[index].id)
            .map_or(true, |c| evaluate_condition(c, &inst.form_data, &inst.variables));

        if !eligible {
            let step = &mut inst.steps[index];
            step.status = StepStatus::Skipped;
            step.end_time = Some(now);
            step.set_meta(META_SKIPPED_REASON, SKIP_CONDITION_NOT_MET);
            skipped.push(step.id.clone());
            continue;
        }

        let assignee = resolve_assignee(&inst.steps[index], inst, template, org);
        inst.current_step_index = index as i32;
        let step = &mut inst.steps[index];
        step.status = StepStatus::InProgress;
        step.start_time = Some(now);
        step.assignee_id = assignee;

        match assignee {
            Some(recipient_id) => intents.push(Intent::Notify(NotificationIntent {
                recipient_id,
                title: format!("Action required: {}", step.name),
                body: format!("Step '{}' of '{}' is waiting for you.", step.name, inst.name),
                step_id: Some(step.id.clone()),
            })),
            None => {
                let warning = EngineWarning::UnresolvableAssignee {
                    step_id: step.id.clone(),
                    assignee_role: step.assignee_role.clone(),
                };
                inst.warnings.push(warning.clone());
                intents.push(Intent::Warn(warning));
            }
        }

        return Scan {
            activated: Some(index),
            skipped,
        };
    }

    inst.status = InstanceStatus::Completed;
    inst.end_date = Some(now);
    inst.current_step_index = inst.steps.len() as i32;
    Scan {
        activated: None,
        skipped,
    }
}

/// Move a draft (or brand-new) instance to `active` and activate its first
/// eligible step.
fn start(
    template: &WorkflowTemplate,
    inst: &mut WorkflowInstance,
    org: &dyn OrgLookup,
    now: Timestamp,
    intents: &mut Vec<Intent>,
) -> Scan {
    inst.status = InstanceStatus::Active;
    inst.start_date = Some(now);
    activate_next(template, inst, 0, org, now, intents)
}

fn completion_intents(inst: &WorkflowInstance, actor: &Actor) -> Vec<Intent> {
    vec![
        Intent::Audit(AuditIntent {
            action: action_types::COMPLETE_WORKFLOW.to_string(),
            actor: actor.clone(),
            changes: json!({
                "status": InstanceStatus::Completed.as_str(),
                "end_date": inst.end_date,
            }),
        }),
        Intent::Notify(NotificationIntent {
            recipient_id: inst.initiator_id,
            title: format!("Workflow completed: {}", inst.name),
            body: format!("'{}' has finished all of its steps.", inst.name),
            step_id: None,
        }),
    ]
}

fn step_id_at(inst: &WorkflowInstance, index: Option<usize>) -> Option<String> {
    index.and_then(|i| inst.steps.get(i)).map(|s| s.id.clone())
}

fn ensure_template_matches(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
) -> Result<(), CoreError> {
    if template.id != instance.template_id || template.version != instance.template_version {
        return Err(CoreError::Validation(format!(
            "Instance {} was created from template {} v{}, got template {} v{}",
            instance.id,
            instance.template_id,
            instance.template_version,
            template.id,
            template.version
        )));
    }
    Ok(())
}

fn invalid_state(inst: &WorkflowInstance, operation: &str) -> CoreError {
    CoreError::InvalidState(format!(
        "Cannot {operation} workflow instance {} in status '{}'",
        inst.id,
        inst.status.as_str()
    ))
}

// ---------------------------------------------------------------------------
// createInstance
// ---------------------------------------------------------------------------

/// Instantiate `template`.
///
/// All steps start `pending`; the first step whose condition passes against
/// the initial form data becomes `in_progress` with a resolved assignee.
/// When no step is eligible the instance is created already `completed`.
/// The returned instance has `id = 0` until the store assigns one.
pub fn create_instance(
    template: &WorkflowTemplate,
    new: NewInstance,
    org: &dyn OrgLookup,
) -> Result<Transition, CoreError> {
    validate_template(template)?;
    if !template.is_active {
        return Err(CoreError::InvalidState(format!(
            "Template {} v{} is not active",
            template.id, template.version
        )));
    }

    let now = Utc::now();
    let (related_type, related_id, related_name) = match new.related_entity {
        Some(e) => (Some(e.entity_type), Some(e.entity_id), e.entity_name),
        None => (None, None, None),
    };

    let mut inst = WorkflowInstance {
        id: 0,
        company_id: new.company_id.unwrap_or(template.company_id),
        template_id: template.id,
        template_name: template.name.clone(),
        template_version: template.version,
        workflow_type: template.workflow_type,
        name: new.name.unwrap_or_else(|| template.name.clone()),
        description: new.description,
        status: InstanceStatus::Draft,
        steps: template.steps.iter().map(WorkflowStep::from_template).collect(),
        current_step_index: -1,
        initiator_id: new.initiator.id,
        initiator_name: new.initiator.name.clone(),
        related_entity_type: related_type,
        related_entity_id: related_id,
        related_entity_name: related_name,
        form_data: new.initial_form_data,
        variables: new.variables,
        priority: new.priority,
        due_date: new.due_date,
        start_date: None,
        end_date: None,
        created_at: now,
        updated_at: now,
        version: 0,
        warnings: Vec::new(),
    };

    let mut side = Vec::new();
    let scan = if new.as_draft {
        None
    } else {
        Some(start(template, &mut inst, org, now, &mut side))
    };

    let mut intents = vec![Intent::Audit(AuditIntent {
        action: action_types::CREATE_WORKFLOW.to_string(),
        actor: new.initiator.clone(),
        changes: json!({
            "template_id": template.id,
            "template_version": template.version,
            "status": inst.status.as_str(),
            "current_step": scan.as_ref().and_then(|s| step_id_at(&inst, s.activated)),
            "skipped_steps": scan.as_ref().map(|s| s.skipped.clone()).unwrap_or_default(),
        }),
    })];
    intents.extend(side);
    if inst.status == InstanceStatus::Completed {
        intents.extend(completion_intents(&inst, &new.initiator));
    }

    Ok(Transition {
        instance: inst,
        intents,
    })
}

// ---------------------------------------------------------------------------
// advanceStep
// ---------------------------------------------------------------------------

/// Complete the current step and, unless held, activate the next eligible one.
///
/// A draft is activated first. When its activation finds no eligible step the
/// instance completes and the command's step is not checked.
///
/// Errors:
/// - `Validation`: malformed command, missing required step fields, or a
///   template that is not the one the instance was created from
/// - `InvalidState`: paused or terminal instance, or the current step is
///   already completed and waiting for [`enter_next_step`]
/// - `StepMismatch`: `command.step_id` is not the current step
pub fn advance_step(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
    org: &dyn OrgLookup,
    config: &EngineConfig,
) -> Result<Transition, CoreError> {
    command.validate()?;
    ensure_template_matches(template, instance)?;

    let now = Utc::now();
    let mut inst = instance.clone();
    inst.warnings.clear();
    let mut activated_from_draft = false;

    match inst.status {
        InstanceStatus::Active => {}
        InstanceStatus::Draft => {
            // Draft activation intents are superseded by the advancement below.
            let scan = start(template, &mut inst, org, now, &mut Vec::new());
            if scan.activated.is_none() {
                // Every step was skipped by its condition: the draft completes
                // on activation and there is nothing left to advance.
                inst.updated_at = now;
                let intents = completion_intents(&inst, &command.actor);
                return Ok(Transition {
                    instance: inst,
                    intents,
                });
            }
            inst.warnings.clear();
            activated_from_draft = true;
        }
        InstanceStatus::Paused | InstanceStatus::Completed | InstanceStatus::Cancelled => {
            return Err(invalid_state(&inst, "advance"));
        }
    }

    let index = usize::try_from(inst.current_step_index)
        .ok()
        .filter(|i| *i < inst.steps.len())
        .ok_or_else(|| invalid_state(&inst, "advance"))?;

    let current = &inst.steps[index];
    if current.id != command.step_id {
        return Err(CoreError::StepMismatch {
            expected: current.id.clone(),
            actual: command.step_id.clone(),
        });
    }
    if current.status != StepStatus::InProgress {
        return Err(CoreError::InvalidState(format!(
            "Step '{}' is already {}; enter the next step before advancing again",
            current.id,
            current.status.as_str()
        )));
    }

    let submitted = command.form_data.clone().unwrap_or_default();
    if let Some(tpl_step) = template.step(&current.id) {
        let missing: Vec<&str> = tpl_step
            .required_fields()
            .into_iter()
            .filter(|f| {
                // The submitted value wins the merge, so an explicit null
                // clears a stored one.
                let merged = submitted.get(*f).or_else(|| inst.form_data.get(*f));
                !merged.is_some_and(|v| !v.is_null())
            })
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "Step '{}' requires fields: {}",
                current.id,
                missing.join(", ")
            )));
        }
    }

    // Shallow merge, last writer wins.
    let changed_fields: Vec<String> = submitted.keys().cloned().collect();
    for (key, value) in &submitted {
        inst.form_data.insert(key.clone(), value.clone());
        inst.variables.insert(key.clone(), value.clone());
    }

    let step = &mut inst.steps[index];
    step.status = StepStatus::Completed;
    step.end_time = Some(now);
    step.set_meta(META_RESULT, command.result.trim());
    step.set_meta(META_ACTOR_ID, command.actor.id);
    step.set_meta(META_ACTOR_NAME, command.actor.name.clone());
    if let Some(comments) = &command.comments {
        step.set_meta(META_COMMENTS, comments.clone());
    }
    if !submitted.is_empty() {
        step.set_meta(META_FORM_DATA, serde_json::Value::Object(submitted));
    }
    let from_step = step.id.clone();

    let hold = !command.advance_to_next && config.hold_mode == HoldMode::AwaitEnterNext;
    let mut side = Vec::new();
    let scan = if hold {
        Scan {
            activated: Some(index),
            skipped: Vec::new(),
        }
    } else {
        activate_next(template, &mut inst, index + 1, org, now, &mut side)
    };
    inst.updated_at = now;

    let to_step = if hold {
        None
    } else {
        step_id_at(&inst, scan.activated)
    };
    let mut intents = vec![Intent::Audit(AuditIntent {
        action: action_types::ADVANCE_WORKFLOW_STEP.to_string(),
        actor: command.actor.clone(),
        changes: json!({
            "from_step": from_step,
            "to_step": to_step,
            "result": command.result.trim(),
            "skipped_steps": scan.skipped,
            "changed_fields": changed_fields,
            "held": hold,
            "activated_from_draft": activated_from_draft,
            "status": inst.status.as_str(),
        }),
    })];
    intents.extend(side);
    if inst.status == InstanceStatus::Completed {
        intents.extend(completion_intents(&inst, &command.actor));
    }

    Ok(Transition {
        instance: inst,
        intents,
    })
}

/// Leave the held half-state: activate the step after the completed current
/// one (or complete the instance).
pub fn enter_next_step(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
    actor: &Actor,
    org: &dyn OrgLookup,
) -> Result<Transition, CoreError> {
    ensure_template_matches(template, instance)?;
    if instance.status != InstanceStatus::Active {
        return Err(invalid_state(instance, "enter the next step of"));
    }
    let current = instance
        .current_step()
        .ok_or_else(|| invalid_state(instance, "enter the next step of"))?;
    if current.status != StepStatus::Completed {
        return Err(CoreError::InvalidState(format!(
            "Step '{}' is {}; it must be completed before entering the next step",
            current.id,
            current.status.as_str()
        )));
    }

    let now = Utc::now();
    let mut inst = instance.clone();
    inst.warnings.clear();
    let from_step = current.id.clone();
    let index = inst.current_step_index as usize;

    let mut side = Vec::new();
    let scan = activate_next(template, &mut inst, index + 1, org, now, &mut side);
    inst.updated_at = now;

    let mut intents = vec![Intent::Audit(AuditIntent {
        action: action_types::ENTER_NEXT_STEP.to_string(),
        actor: actor.clone(),
        changes: json!({
            "from_step": from_step,
            "to_step": step_id_at(&inst, scan.activated),
            "skipped_steps": scan.skipped,
            "status": inst.status.as_str(),
        }),
    })];
    intents.extend(side);
    if inst.status == InstanceStatus::Completed {
        intents.extend(completion_intents(&inst, actor));
    }

    Ok(Transition {
        instance: inst,
        intents,
    })
}

// ---------------------------------------------------------------------------
// Pause / resume
// ---------------------------------------------------------------------------

pub fn pause(
    instance: &WorkflowInstance,
    actor: &Actor,
    reason: Option<&str>,
) -> Result<Transition, CoreError> {
    if instance.status != InstanceStatus::Active {
        return Err(invalid_state(instance, "pause"));
    }
    let mut inst = instance.clone();
    inst.status = InstanceStatus::Paused;
    inst.updated_at = Utc::now();
    let intents = vec![Intent::Audit(AuditIntent {
        action: action_types::PAUSE_WORKFLOW.to_string(),
        actor: actor.clone(),
        changes: json!({
            "from_status": InstanceStatus::Active.as_str(),
            "to_status": InstanceStatus::Paused.as_str(),
            "reason": reason,
            "current_step": inst.current_step().map(|s| s.id.clone()),
        }),
    })];
    Ok(Transition {
        instance: inst,
        intents,
    })
}

pub fn resume(instance: &WorkflowInstance, actor: &Actor) -> Result<Transition, CoreError> {
    if instance.status != InstanceStatus::Paused {
        return Err(invalid_state(instance, "resume"));
    }
    let mut inst = instance.clone();
    inst.status = InstanceStatus::Active;
    inst.updated_at = Utc::now();
    let intents = vec![Intent::Audit(AuditIntent {
        action: action_types::RESUME_WORKFLOW.to_string(),
        actor: actor.clone(),
        changes: json!({
            "from_status": InstanceStatus::Paused.as_str(),
            "to_status": InstanceStatus::Active.as_str(),
            "current_step": inst.current_step().map(|s| s.id.clone()),
        }),
    })];
    Ok(Transition {
        instance: inst,
        intents,
    })
}

// ---------------------------------------------------------------------------
// Terminal short-circuits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    Reject,
    Cancel,
}

/// Reject the instance: terminal `cancelled` regardless of position.
///
/// The active step is closed as `completed` with result `"rejected"` and the
/// reason in its metadata; every pending step becomes `skipped`. `action` is
/// the domain-specific audit tag (e.g. `reject_candidate`).
pub fn reject(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
    action: &str,
) -> Result<Transition, CoreError> {
    terminate(instance, reason, actor, action, Termination::Reject)
}

/// Cancel the instance. Same terminal effect as [`reject`]; the active step
/// is `skipped` and carries the cancellation reason.
pub fn cancel(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    terminate(
        instance,
        reason,
        actor,
        action_types::CANCEL_WORKFLOW,
        Termination::Cancel,
    )
}

fn terminate(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
    action: &str,
    kind: Termination,
) -> Result<Transition, CoreError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CoreError::Validation("A reason is required".into()));
    }
    let allowed = match instance.status {
        InstanceStatus::Active | InstanceStatus::Paused => true,
        InstanceStatus::Draft => kind == Termination::Cancel,
        InstanceStatus::Completed | InstanceStatus::Cancelled => false,
    };
    if !allowed {
        let op = match kind {
            Termination::Reject => "reject",
            Termination::Cancel => "cancel",
        };
        return Err(invalid_state(instance, op));
    }

    let now = Utc::now();
    let mut inst = instance.clone();
    inst.warnings.clear();
    let from_status = inst.status;
    let current_index = usize::try_from(inst.current_step_index).ok();
    let mut closed_step = None;
    let mut skipped = Vec::new();

    for (index, step) in inst.steps.iter_mut().enumerate() {
        match step.status {
            StepStatus::InProgress => {
                match kind {
                    Termination::Reject => {
                        step.status = StepStatus::Completed;
                        step.set_meta(META_RESULT, RESULT_REJECTED);
                        step.set_meta(META_REJECTION_REASON, reason);
                    }
                    Termination::Cancel => {
                        step.status = StepStatus::Skipped;
                        step.set_meta(META_SKIPPED_REASON, SKIP_TERMINATED);
                        step.set_meta(META_CANCELLATION_REASON, reason);
                    }
                }
                step.set_meta(META_ACTOR_ID, actor.id);
                step.set_meta(META_ACTOR_NAME, actor.name.clone());
                step.end_time = Some(now);
                closed_step = Some(step.id.clone());
            }
            StepStatus::Pending => {
                step.status = StepStatus::Skipped;
                step.end_time = Some(now);
                step.set_meta(META_SKIPPED_REASON, SKIP_TERMINATED);
                skipped.push(step.id.clone());
            }
            StepStatus::Completed | StepStatus::Skipped => {
                // A held step keeps its own result; only the reason is attached.
                if Some(index) == current_index && closed_step.is_none() {
                    let key = match kind {
                        Termination::Reject => META_REJECTION_REASON,
                        Termination::Cancel => META_CANCELLATION_REASON,
                    };
                    step.set_meta(key, reason);
                    closed_step = Some(step.id.clone());
                }
            }
        }
    }

    inst.status = InstanceStatus::Cancelled;
    inst.end_date = Some(now);
    inst.current_step_index = inst.steps.len() as i32;
    inst.updated_at = now;

    let verb = match kind {
        Termination::Reject => "rejected",
        Termination::Cancel => "cancelled",
    };
    let mut intents = vec![Intent::Audit(AuditIntent {
        action: action.to_string(),
        actor: actor.clone(),
        changes: json!({
            "from_status": from_status.as_str(),
            "to_status": InstanceStatus::Cancelled.as_str(),
            "from_step": closed_step,
            "reason": reason,
            "skipped_steps": skipped,
        }),
    })];
    if inst.initiator_id != actor.id {
        intents.push(Intent::Notify(NotificationIntent {
            recipient_id: inst.initiator_id,
            title: format!("Workflow {verb}: {}", inst.name),
            body: format!("'{}' was {verb} by {}: {reason}", inst.name, actor.name),
            step_id: closed_step,
        }));
    }

    Ok(Transition {
        instance: inst,
        intents,
    })
}

/// Recipient ids of the notification intents, for logging.
pub fn notified_actors(transition: &Transition) -> Vec<DbId> {
    transition.notifications().map(|n| n.recipient_id).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
