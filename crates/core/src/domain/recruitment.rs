//! Recruitment: offers, interview scores, candidate rejection.

use crate::audit::action_types;
use crate::domain::ensure_type;
use crate::domain::payload::{merged_form_data, DomainPayload, RecruitmentPayload};
use crate::error::CoreError;
use crate::workflow::assignee::OrgLookup;
use crate::workflow::command::AdvanceCommand;
use crate::workflow::engine::{self, EngineConfig};
use crate::workflow::instance::{Actor, WorkflowInstance};
use crate::workflow::intent::Transition;
use crate::workflow::status::WorkflowType;
use crate::workflow::template::WorkflowTemplate;

pub const MAX_INTERVIEW_SCORE: f64 = 100.0;

pub fn validate(payload: &RecruitmentPayload) -> Result<(), CoreError> {
    if let Some(amount) = payload.offer_amount {
        if amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Offer amount must be positive, got {amount}"
            )));
        }
    }
    if let Some(score) = payload.interview_score {
        if !(0.0..=MAX_INTERVIEW_SCORE).contains(&score) {
            return Err(CoreError::Validation(format!(
                "Interview score must be between 0 and {MAX_INTERVIEW_SCORE}, got {score}"
            )));
        }
    }
    Ok(())
}

/// Typed payload as it would stand after `command` is applied.
pub fn payload_for(
    instance: &WorkflowInstance,
    command: &AdvanceCommand,
) -> Result<RecruitmentPayload, CoreError> {
    let merged = merged_form_data(&instance.form_data, command.form_data.as_ref());
    match DomainPayload::parse(WorkflowType::Recruitment, &merged)? {
        DomainPayload::Recruitment(payload) => Ok(payload),
        other => Err(CoreError::Internal(format!(
            "Recruitment form parsed as {other:?}"
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
    ensure_type(instance, WorkflowType::Recruitment)?;
    validate(&payload_for(instance, command)?)?;
    engine::advance_step(template, instance, command, org, config)
}

/// Reject the candidate. Ends the process wherever it stands.
pub fn reject(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::Recruitment)?;
    engine::reject(instance, reason, actor, action_types::REJECT_CANDIDATE)
}

pub fn cancel(
    instance: &WorkflowInstance,
    reason: &str,
    actor: &Actor,
) -> Result<Transition, CoreError> {
    ensure_type(instance, WorkflowType::Recruitment)?;
    engine::cancel(instance, reason, actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{form, hr, started};
    use crate::types::JsonMap;
    use crate::workflow::assignee::NoOrgLookup;
    use crate::workflow::instance::META_REJECTION_REASON;
    use crate::workflow::status::{InstanceStatus, StepStatus};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn offer(inst: &WorkflowInstance, template: &WorkflowTemplate, data: serde_json::Value) -> Result<Transition, CoreError> {
        let cmd = AdvanceCommand::new("offer", "sent", hr()).with_form_data(form(data));
        advance(template, inst, &cmd, &NoOrgLookup, &EngineConfig::default())
    }

    #[test]
    fn positive_offer_advances() {
        let (t, inst) = started(WorkflowType::Recruitment, &["offer", "sign"], JsonMap::new());
        let tr = offer(&inst, &t, json!({"offer_amount": 8500})).unwrap();
        assert_eq!(tr.instance.current_step().unwrap().id, "sign");
        assert_eq!(tr.instance.form_data["offer_amount"], 8500);
    }

    #[test]
    fn non_positive_offer_rejected() {
        let (t, inst) = started(WorkflowType::Recruitment, &["offer", "sign"], JsonMap::new());
        assert_matches!(
            offer(&inst, &t, json!({"offer_amount": 0})),
            Err(CoreError::Validation(ref m)) if m.contains("Offer amount")
        );
        assert_matches!(
            offer(&inst, &t, json!({"offer_amount": "-100"})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn interview_score_range_enforced() {
        let (t, inst) = started(WorkflowType::Recruitment, &["offer"], JsonMap::new());
        assert_matches!(
            offer(&inst, &t, json!({"interview_score": 130})),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn stored_invalid_amount_blocks_later_steps() {
        let (t, inst) = started(
            WorkflowType::Recruitment,
            &["offer"],
            form(json!({"offer_amount": -1})),
        );
        assert_matches!(offer(&inst, &t, json!({})), Err(CoreError::Validation(_)));
        // Correcting the value in the submission unblocks it.
        assert!(offer(&inst, &t, json!({"offer_amount": 100})).is_ok());
    }

    #[test]
    fn reject_candidate_closes_active_step() {
        let (_, inst) = started(WorkflowType::Recruitment, &["screen", "interview"], JsonMap::new());
        let tr = reject(&inst, "insufficient experience", &hr()).unwrap();
        assert_eq!(tr.audit_actions(), vec![action_types::REJECT_CANDIDATE]);
        assert_eq!(tr.instance.status, InstanceStatus::Cancelled);
        assert_eq!(tr.instance.steps[0].status, StepStatus::Completed);
        assert_eq!(
            tr.instance.steps[0].meta_str(META_REJECTION_REASON),
            Some("insufficient experience")
        );
    }

    #[test]
    fn wrong_workflow_type_refused() {
        let (t, inst) = started(WorkflowType::Resignation, &["offer"], JsonMap::new());
        assert_matches!(reject(&inst, "no", &hr()), Err(CoreError::Validation(_)));
        assert_matches!(cancel(&inst, "no", &hr()), Err(CoreError::Validation(_)));
        assert_matches!(offer(&inst, &t, json!({})), Err(CoreError::Validation(_)));
    }
}
