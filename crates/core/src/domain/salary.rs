//! Salary adjustment: amounts and the size of the change.

use crate::audit::action_types;
use crate::domain::ensure_type;
use crate::domain::payload::{merged_form_data, DomainPayload, SalaryPayload};
use crate::error::CoreError;
use crate::workflow::assignee::OrgLookup;
use crate::workflow::command::AdvanceCommand;
use crate::workflow::engine::{self, EngineConfig};
use crate::workflow::instance::{Actor, WorkflowInstance};
use crate::workflow::intent::Transition;
use crate::workflow::status::{Priority, WorkflowType};
use crate::workflow::template::WorkflowTemplate;

/// Largest relative change allowed without `urgent` priority.
pub const MAX_CHANGE_RATIO: f64 = 0.5;

/// Relative change from `current` to `proposed` (0.1 = 10 %).
pub fn change_ratio(current: f64, proposed: f64) -> f64 {
    (proposed - current).abs() / current
}

pub fn validate(payload: &SalaryPayload, priority: Priority) -> Result<(), CoreError> {
    for (field, amount) in [
        ("current_amount", payload.current_amount),
        ("proposed_amount", payload.proposed_amount),
    ] {
        if let Some(amount) = amount {
            if amount <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "Field '{field}' must be positive, got {amount}"
                )));
            }
        }
    }
    if let (Some(current), Some(proposed)) = (payload.current_amount, payload.proposed_amount) {
        let ratio = change_ratio(current, proposed);
        if ratio > MAX_CHANGE_RATIO && priority != Priority::Urgent {
            return Err(CoreError::Validation(format!(
                "Salary change of {:.0}% exceeds {:.0}%; mark the request urgent to proceed",
                ratio * 100.0,
                MAX_CHANGE_RATIO * 100.0
            )));
        }
    }
    Ok(())
}

pub fn payload_for(
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
) -> Result<SalaryPayload, CoreError> {
    let merged = merged_form_data(&instance.form_data, command.form_data.as_ref());
    match DomainPayload::parse(WorkflowType::SalaryAdjustment, &merged)? {
        DomainPayload::Salary(payload) => Ok(payload),
        other => Err(CoreError::Internal(format!(
            "Salary form parsed as {other:?}"
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
    ensure_type(instance, WorkflowType::SalaryAdjustment)?;
    validate(&payload_for(instance, command)?, instance.priority)?;
    engine::advance_step(template, instance, command, org, config)
}

pub fn reject(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::SalaryAdjustment)?;
    engine::reject(instance, reason, actor, action_types::REJECT_SALARY_ADJUSTMENT)
}

pub fn cancel(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::SalaryAdjustment)?;
    engine::cancel(instance, reason, actor)
}
