//! Advancement commands: request values, never persisted.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JsonMap;
use crate::workflow::instance::Actor;

/// Maximum length of a step result tag, in characters.
pub const MAX_RESULT_LEN: usize = 64;

/// Maximum length of free-text comments, in characters.
pub const MAX_COMMENTS_LEN: usize = 4000;

/// Request to complete the current step of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceCommand {
    pub step_id: String,
    /// Outcome tag recorded on the step (e.g. `"approved"`, `"passed"`).
    pub result: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub form_data: Option<JsonMap>,
    pub advance_to_next: bool,
    pub actor: Actor,
}

impl AdvanceCommand {
    pub fn new(step_id: impl Into<String>, result: impl Into<String>, actor: Actor) -> Self {
        Self {
            step_id: step_id.into(),
            result: result.into(),
            comments: None,
            form_data: None,
            advance_to_next: true,
            actor,
        }
    }

    pub fn with_form_data(mut self, form_data: JsonMap) -> Self {
        self.form_data = Some(form_data);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Complete the step without activating the next one.
    pub fn holding(mut self) -> Self {
        self.advance_to_next = false;
        self
    }

    /// Reject malformed payloads before the engine touches the instance.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.step_id.trim().is_empty() {
            return Err(CoreError::Validation("step_id is required".into()));
        }
        let result = self.result.trim();
        if result.is_empty() {
            return Err(CoreError::Validation("result is required".into()));
        }
        if result.chars().count() > MAX_RESULT_LEN {
            return Err(CoreError::Validation(format!(
                "result must be at most {MAX_RESULT_LEN} characters"
            )));
        }
        if self
            .comments
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENTS_LEN)
        {
            return Err(CoreError::Validation(format!(
                "comments must be at most {MAX_COMMENTS_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new(1, "Ana", "hr")
    }

    #[test]
    fn blank_result_is_a_validation_error() {
        let cmd = AdvanceCommand::new("apply", "  ", actor());
        assert!(matches!(cmd.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn blank_step_id_is_a_validation_error() {
        let cmd = AdvanceCommand::new("", "approved", actor());
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn oversized_comments_rejected() {
        let cmd = AdvanceCommand::new("apply", "approved", actor())
            .with_comments("x".repeat(MAX_COMMENTS_LEN + 1));
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn result_limit_counts_characters() {
        let at_limit = AdvanceCommand::new("apply", "通".repeat(MAX_RESULT_LEN), actor());
        assert!(at_limit.validate().is_ok());

        let over = AdvanceCommand::new("apply", "通".repeat(MAX_RESULT_LEN + 1), actor());
        assert!(matches!(over.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn defaults_to_advancing() {
        let cmd = AdvanceCommand::new("apply", "approved", actor());
        assert!(cmd.advance_to_next);
        assert!(!cmd.holding().advance_to_next);
    }
}
