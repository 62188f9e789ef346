//! Explicit template registry.
//!
//! Holds every known template version keyed by id. Callers own the registry
//! and pass it by reference; there is no process-wide template state.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::DbId;
use crate::workflow::status::WorkflowType;
use crate::workflow::template::{next_template_version, validate_template, WorkflowTemplate};

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<DbId, WorkflowTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template version.
    ///
    /// Rejects duplicate ids and any version that is not strictly greater
    /// than the versions already registered for the same lineage.
    pub fn register(&mut self, template: WorkflowTemplate) -> Result<(), CoreError> {
        validate_template(&template)?;
        if self.templates.contains_key(&template.id) {
            return Err(CoreError::Conflict(format!(
                "Template {} is already registered",
                template.id
            )));
        }
        let (company_id, workflow_type, name) = template.lineage_key();
        let latest = self
            .versions_of(company_id, workflow_type, name)
            .into_iter()
            .max();
        if let Some(latest) = latest {
            if template.version <= latest {
                return Err(CoreError::Conflict(format!(
                    "Template '{name}' already has version {latest}; got {}",
                    template.version
                )));
            }
        }
        self.templates.insert(template.id, template);
        Ok(())
    }

    pub fn get(&self, id: DbId) -> Option<&WorkflowTemplate> {
        self.templates.get(&id)
    }

    pub fn require(&self, id: DbId) -> Result<&WorkflowTemplate, CoreError> {
        self.get(id).ok_or(CoreError::NotFound {
            entity: "WorkflowTemplate",
            id,
        })
    }

    /// Whether `company_id` may instantiate or read template `id`.
    pub fn is_visible_to(template: &WorkflowTemplate, company_id: DbId) -> bool {
        template.company_id == company_id || template.is_public
    }

    /// Highest active version of `workflow_type` for a company.
    ///
    /// The company's own templates win over public ones.
    pub fn latest_active(
        &self,
        company_id: DbId,
        workflow_type: WorkflowType,
    ) -> Option<&WorkflowTemplate> {
        let candidates = || {
            self.templates
                .values()
                .filter(move |t| t.is_active && t.workflow_type == workflow_type)
        };
        candidates()
            .filter(|t| t.company_id == company_id)
            .max_by_key(|t| (t.version, t.id))
            .or_else(|| {
                candidates()
                    .filter(|t| t.is_public)
                    .max_by_key(|t| (t.version, t.id))
            })
    }

    /// Active templates visible to a company, ordered by name then version.
    pub fn list_active(&self, company_id: DbId) -> Vec<&WorkflowTemplate> {
        let mut list: Vec<_> = self
            .templates
            .values()
            .filter(|t| t.is_active && Self::is_visible_to(t, company_id))
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.version.cmp(&b.version)));
        list
    }

    pub fn versions_of(
        &self,
        company_id: DbId,
        workflow_type: WorkflowType,
        name: &str,
    ) -> Vec<i32> {
        self.templates
            .values()
            .filter(|t| t.lineage_key() == (company_id, workflow_type, name))
            .map(|t| t.version)
            .collect()
    }

    pub fn next_version(&self, company_id: DbId, workflow_type: WorkflowType, name: &str) -> i32 {
        next_template_version(&self.versions_of(company_id, workflow_type, name))
    }

    pub fn set_active(&mut self, id: DbId, active: bool) -> Result<(), CoreError> {
        let template = self.templates.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "WorkflowTemplate",
            id,
        })?;
        template.is_active = active;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
