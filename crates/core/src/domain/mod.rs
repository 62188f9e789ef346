//! Domain extensions layered on the generic engine.
//!
//! Recruitment, resignation and salary adjustment parse a typed payload out
//! of the form data, enforce their business rules, and tag rejections with
//! their own audit action. Every other workflow type uses the engine as is.

pub mod payload;
pub mod recruitment;
pub mod resignation;
pub mod salary;

pub use payload::{DomainPayload, RecruitmentPayload, ResignationPayload, SalaryPayload};

use crate::audit::action_types;
use crate::error::CoreError;
use crate::workflow::assignee::OrgLookup;
use crate::workflow::command::AdvanceCommand;
use crate::workflow::engine::{self, EngineConfig};
use crate::workflow::instance::{Actor, WorkflowInstance};
use crate::workflow::intent::Transition;
use crate::workflow::status::WorkflowType;
use crate::workflow::template::WorkflowTemplate;

/// Audit tag recorded when an instance of `workflow_type` is rejected.
pub fn reject_action(workflow_type: WorkflowType) -> &'static str {
    match workflow_type {
        WorkflowType::Recruitment => action_types::REJECT_CANDIDATE,
        WorkflowType::Resignation => action_types::REJECT_RESIGNATION,
        WorkflowType::SalaryAdjustment => action_types::REJECT_SALARY_ADJUSTMENT,
        _ => action_types::REJECT_WORKFLOW,
    }
}

pub(crate) fn ensure_type(
    instance: &WorkflowInstance,
    expected: WorkflowType,
) -> Result<(), CoreError> {
    if instance.workflow_type != expected {
        return Err(CoreError::Validation(format!(
            "Workflow instance {} is a {} workflow, not {}",
            instance.id,
            instance.workflow_type.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}

/// Advance with the domain rules of the instance's workflow type applied first.
pub fn advance(
    template: &WorkflowTemplate,
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
    org: &dyn OrgLookup,
    config: &EngineConfig,
) -> Result<Transition, CoreError> {
    match instance.workflow_type {
        WorkflowType::Recruitment => recruitment::advance(template, instance, command, org, config),
        WorkflowType::Resignation => resignation::advance(template, instance, command, org, config),
        WorkflowType::SalaryAdjustment => salary::advance(template, instance, command, org, config),
        _ => engine::advance_step(template, instance, command, org, config),
    }
}

/// Reject using the domain-specific audit tag.
pub fn reject(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    match instance.workflow_type {
        WorkflowType::Recruitment => recruitment::reject(instance, reason, actor),
        WorkflowType::Resignation => resignation::reject(instance, reason, actor),
        WorkflowType::SalaryAdjustment => salary::reject(instance, reason, actor),
        other => engine::reject(instance, reason, actor, reject_action(other)),
    }
}

pub fn cancel(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    match instance.workflow_type {
        WorkflowType::Recruitment => recruitment::cancel(instance, reason, actor),
        WorkflowType::Resignation => resignation::cancel(instance, reason, actor),
        WorkflowType::SalaryAdjustment => salary::cancel(instance, reason, actor),
        _ => engine::cancel(instance, reason, actor),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::JsonMap;
    use crate::workflow::assignee::NoOrgLookup;
    use crate::workflow::engine::{create_instance, NewInstance};
    use crate::workflow::instance::{Actor, WorkflowInstance};
    use crate::workflow::status::WorkflowType;
    use crate::workflow::template::fixtures::linear_template;
    use crate::workflow::template::WorkflowTemplate;

    pub fn hr() -> Actor {
        Actor::new(1, "Hana", "hr")
    }

    pub fn form(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => JsonMap::new(),
        }
    }

    /// A staffed template of `workflow_type` and a fresh instance of it.
    pub fn started(
        workflow_type: WorkflowType,
        ids: &[&str],
        initial: JsonMap,
    ) -> (WorkflowTemplate, WorkflowInstance) {
        let mut template = linear_template(ids);
        template.workflow_type = workflow_type;
        for step in &mut template.steps {
            step.assignee_id = Some(1);
        }
        let mut instance = create_instance(
            &template,
            NewInstance::new(hr()).with_form_data(initial),
            &NoOrgLookup,
        )
        .unwrap()
        .instance;
        instance.id = 5;
        (template, instance)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{hr, started};
    use super::*;
    use crate::types::JsonMap;
    use crate::workflow::assignee::NoOrgLookup;
    use crate::workflow::status::InstanceStatus;

    #[test]
    fn reject_dispatches_tag_by_type() {
        let cases = [
            (WorkflowType::Recruitment, action_types::REJECT_CANDIDATE),
            (WorkflowType::Resignation, action_types::REJECT_RESIGNATION),
            (WorkflowType::SalaryAdjustment, action_types::REJECT_SALARY_ADJUSTMENT),
            (WorkflowType::Training, action_types::REJECT_WORKFLOW),
        ];
        for (workflow_type, tag) in cases {
            let (_, inst) = started(workflow_type, &["a", "b"], JsonMap::new());
            let tr = reject(&inst, "not approved", &hr()).unwrap();
            assert_eq!(tr.audit_actions(), vec![tag]);
            assert_eq!(tr.instance.status, InstanceStatus::Cancelled);
        }
    }

    #[test]
    fn generic_types_advance_through_engine() {
        let (template, inst) = started(WorkflowType::Onboarding, &["laptop", "badge"], JsonMap::new());
        let tr = advance(
            &template,
            &inst,
            &AdvanceCommand::new("laptop", "issued", hr()),
            &NoOrgLookup,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(tr.instance.current_step().unwrap().id, "badge");
    }

    #[test]
    fn cancel_uses_cancel_tag_for_every_type() {
        for workflow_type in [WorkflowType::Recruitment, WorkflowType::Transfer] {
            let (_, inst) = started(workflow_type, &["a"], JsonMap::new());
            let tr = cancel(&inst, "duplicate request", &hr()).unwrap();
            assert_eq!(tr.audit_actions(), vec![action_types::CANCEL_WORKFLOW]);
        }
    }
}
