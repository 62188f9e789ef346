//! Workflow templates: versioned blueprints of ordered steps.
//!
//! A template is immutable once stored. Edits produce a new row with the next
//! version number for the same `(company_id, workflow_type, name)` key, and
//! running instances keep pointing at the version they were created from.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::workflow::condition::StepCondition;
use crate::workflow::status::WorkflowType;

/// Template step metadata key listing form fields the step must receive.
pub const META_REQUIRED_FIELDS: &str = "required_fields";

/// Maximum number of steps a template may declare.
pub const MAX_TEMPLATE_STEPS: usize = 50;

/// One step skeleton. Order within [`WorkflowTemplate::steps`] is the default
/// linear progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub assignee_role: Option<String>,
    /// Explicit assignee; wins over every dynamic rule.
    #[serde(default)]
    pub assignee_id: Option<DbId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl TemplateStep {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            assignee_role: None,
            assignee_id: None,
            description: None,
            metadata: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.assignee_role = Some(role.into());
        self
    }

    pub fn with_assignee(mut self, actor_id: DbId) -> Self {
        self.assignee_id = Some(actor_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Form fields that must be present when this step is completed.
    pub fn required_fields(&self) -> Vec<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(META_REQUIRED_FIELDS))
            .and_then(|v| v.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A versioned workflow blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub workflow_type: WorkflowType,
    pub version: i32,
    pub is_active: bool,
    pub is_public: bool,
    pub steps: Vec<TemplateStep>,
    /// Role name to ordered candidate actor ids.
    #[serde(default)]
    pub default_assignees: BTreeMap<String, Vec<DbId>>,
    /// Step id to the predicate deciding whether the step runs.
    #[serde(default)]
    pub conditions: BTreeMap<String, StepCondition>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowTemplate {
    pub fn step(&self, step_id: &str) -> Option<&TemplateStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn condition_for(&self, step_id: &str) -> Option<&StepCondition> {
        self.conditions.get(step_id)
    }

    /// First fallback candidate for a role, if any.
    pub fn default_assignee(&self, role: &str) -> Option<DbId> {
        self.default_assignees
            .get(role)
            .and_then(|candidates| candidates.first().copied())
    }

    /// The registry key shared by all versions of this template.
    pub fn lineage_key(&self) -> (DbId, WorkflowType, &str) {
        (self.company_id, self.workflow_type, self.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the structural invariants of a template.
///
/// - at least one step, at most [`MAX_TEMPLATE_STEPS`]
/// - step ids are non-empty and unique
/// - every condition key names a declared step
/// - version starts at 1
pub fn validate_template(template: &WorkflowTemplate) -> Result<(), CoreError> {
    if template.name.trim().is_empty() {
        return Err(CoreError::Validation("Template name must not be empty".into()));
    }
    if template.steps.is_empty() {
        return Err(CoreError::Validation(
            "Template must declare at least one step".into(),
        ));
    }
    if template.steps.len() > MAX_TEMPLATE_STEPS {
        return Err(CoreError::Validation(format!(
            "Template declares {} steps, maximum is {MAX_TEMPLATE_STEPS}",
            template.steps.len()
        )));
    }
    if template.version < 1 {
        return Err(CoreError::Validation(format!(
            "Template version must be >= 1, got {}",
            template.version
        )));
    }

    let mut seen = HashSet::new();
    for step in &template.steps {
        if step.id.trim().is_empty() {
            return Err(CoreError::Validation("Step id must not be empty".into()));
        }
        if !seen.insert(step.id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate step id '{}'",
                step.id
            )));
        }
    }

    if let Some(orphan) = template.conditions.keys().find(|k| !seen.contains(k.as_str())) {
        return Err(CoreError::Validation(format!(
            "Condition references unknown step '{orphan}'"
        )));
    }

    Ok(())
}

/// Next version number for a template lineage given the versions already stored.
pub fn next_template_version(existing: &[i32]) -> i32 {
    existing.iter().copied().max().map_or(1, |v| v + 1)
}
