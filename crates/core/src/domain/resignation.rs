//! Resignation: last working day, reason category, handover.

use crate::audit::action_types;
use crate::domain::ensure_type;
use crate::domain::payload::{merged_form_data, DomainPayload, ResignationPayload};
use crate::error::CoreError;
use crate::workflow::assignee::OrgLookup;
use crate::workflow::command::AdvanceCommand;
use crate::workflow::engine::{self, EngineConfig};
use crate::workflow::instance::{Actor, WorkflowInstance};
use crate::workflow::intent::Transition;
use crate::workflow::status::WorkflowType;
use crate::workflow::template::WorkflowTemplate;

pub const REASON_CATEGORIES: &[&str] = &[
    "career",
    "compensation",
    "personal",
    "relocation",
    "health",
    "retirement",
    "other",
];

pub fn validate(payload: &ResignationPayload, instance: &WorkflowInstance) -> Result<(), CoreError> {
    if let Some(last_day) = payload.last_working_day {
        let started = instance.start_date.unwrap_or(instance.created_at).date_naive();
        if last_day < started {
            return Err(CoreError::Validation(format!(
                "Last working day {last_day} is before the request start date {started}"
            )));
        }
    }
    if let Some(category) = payload.reason_category.as_deref() {
        if !REASON_CATEGORIES.contains(&category) {
            return Err(CoreError::Validation(format!(
                "Invalid reason category '{category}'. Must be one of: {}",
                REASON_CATEGORIES.join(", ")
            )));
        }
    }
    if let (Some(handover), Some(leaver)) = (payload.handover_to, instance.related_entity_id) {
        if handover == leaver {
            return Err(CoreError::Validation(
                "Work cannot be handed over to the resigning employee".into(),
            ));
        }
    }
    Ok(())
}

pub fn payload_for(
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
) -> Result<ResignationPayload, CoreError> {
    let merged = merged_form_data(&instance.form_data, command.form_data.as_ref());
    match DomainPayload::parse(WorkflowType::Resignation, &merged)? {
        DomainPayload::Resignation(payload) => Ok(payload),
        other => Err(CoreError::Internal(format!(
            "Resignation form parsed as {other:?}"
        ))),
    }
}

pub fn advance(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
    org: &dyn OrgLookup,
    config: &EngineConfig,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::Resignation)?;
    validate(&payload_for(instance, command)?, instance)?;
    engine::advance_step(template, instance, command, org, config)
}

pub fn reject(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::Resignation)?;
    engine::reject(instance, reason, actor, action_types::REJECT_RESIGNATION)
}

/// Withdraw the resignation.
pub fn cancel(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::Resignation)?;
    engine::cancel(instance, reason, actor)
}
