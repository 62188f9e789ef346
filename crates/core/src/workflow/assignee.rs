//! Assignee resolution.
//!
//! Resolution order when a step becomes active:
//!
//! 1. explicit `assignee_id` on the template step
//! 2. dynamic rule for `assignee_role`, answered by an [`OrgLookup`]
//! 3. first entry of `template.default_assignees[role]`
//! 4. nobody (`None`)
//!
//! Resolution runs on every activation, so org changes made after the
//! instance was created are honoured. The engine only sees the synchronous
//! [`OrgLookup`]; callers load an [`OrgSnapshot`] from an [`OrgSource`]
//! before invoking it.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles;
use crate::types::DbId;
use crate::workflow::instance::{RelatedEntity, WorkflowInstance, WorkflowStep};
use crate::workflow::template::WorkflowTemplate;

/// Related entity types whose id is an employee id.
const EMPLOYEE_ENTITY_TYPES: &[&str] = &["employee"];

/// Upper bound on department hierarchy walks (guards against cycles).
const MAX_DEPARTMENT_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Maps a role requirement to a concrete actor.
pub trait OrgLookup {
    fn resolve_role(
        &self,
        role: &str,
        related: Option<&RelatedEntity>,
        company_id: DbId,
    ) -> Option<DbId>;
}

/// Lookup that never resolves anything; leaves the template defaults in charge.
pub struct NoOrgLookup;

impl OrgLookup for NoOrgLookup {
    fn resolve_role(&self, _: &str, _: Option<&RelatedEntity>, _: DbId) -> Option<DbId> {
        None
    }
}

/// Async loader for per-company org snapshots.
#[async_trait]
pub trait OrgSource: Send + Sync {
    async fn load_snapshot(&self, company_id: DbId) -> Result<OrgSnapshot, CoreError>;
}

// ---------------------------------------------------------------------------
// OrgSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of one company's org structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgSnapshot {
    pub company_id: DbId,
    /// Employee id to department id.
    pub employee_departments: HashMap<DbId, DbId>,
    /// Department id to parent department id.
    pub parent_departments: HashMap<DbId, DbId>,
    /// Department id to role name to ordered holders.
    pub department_roles: HashMap<DbId, HashMap<String, Vec<DbId>>>,
    /// Company-wide role name to ordered holders.
    pub company_roles: HashMap<String, Vec<DbId>>,
}

impl OrgSnapshot {
    pub fn new(company_id: DbId) -> Self {
        Self {
            company_id,
            ..Default::default()
        }
    }

    pub fn with_employee(mut self, employee_id: DbId, department_id: DbId) -> Self {
        self.employee_departments.insert(employee_id, department_id);
        self
    }

    pub fn with_parent(mut self, department_id: DbId, parent_id: DbId) -> Self {
        self.parent_departments.insert(department_id, parent_id);
        self
    }

    pub fn with_department_role(mut self, department_id: DbId, role: &str, actor_id: DbId) -> Self {
        self.department_roles
            .entry(department_id)
            .or_default()
            .entry(role.to_string())
            .or_default()
            .push(actor_id);
        self
    }

    pub fn with_company_role(mut self, role: &str, actor_id: DbId) -> Self {
        self.company_roles
            .entry(role.to_string())
            .or_default()
            .push(actor_id);
        self
    }

    /// Walk from `department_id` up the hierarchy until a holder of `role` is found.
    fn department_holder(&self, department_id: DbId, role: &str) -> Option<DbId> {
        let mut current = Some(department_id);
        for _ in 0..MAX_DEPARTMENT_DEPTH {
            let dept = current?;
            let holder = self
                .department_roles
                .get(&dept)
                .and_then(|roles| roles.get(role))
                .and_then(|holders| holders.first().copied());
            if holder.is_some() {
                return holder;
            }
            current = self.parent_departments.get(&dept).copied();
        }
        None
    }

    fn company_holder(&self, role: &str) -> Option<DbId> {
        self.company_roles
            .get(role)
            .and_then(|holders| holders.first().copied())
    }
}

impl OrgLookup for OrgSnapshot {
    fn resolve_role(
        &self,
        role: &str,
        related: Option<&RelatedEntity>,
        company_id: DbId,
    ) -> Option<DbId> {
        if company_id != self.company_id {
            return None;
        }
        if roles::is_department_scoped(role) {
            let department = related
                .filter(|r| EMPLOYEE_ENTITY_TYPES.contains(&r.entity_type.as_str()))
                .and_then(|r| self.employee_departments.get(&r.entity_id));
            if let Some(holder) = department.and_then(|d| self.department_holder(*d, role)) {
                return Some(holder);
            }
        }
        self.company_holder(role)
    }
}

/// In-memory [`OrgSource`] keyed by company id.
#[derive(Debug, Clone, Default)]
pub struct StaticOrgSource {
    snapshots: HashMap<DbId, OrgSnapshot>,
}

impl StaticOrgSource {
    pub fn new(snapshots: impl IntoIterator<Item = OrgSnapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().map(|s| (s.company_id, s)).collect(),
        }
    }
}

#[async_trait]
impl OrgSource for StaticOrgSource {
    async fn load_snapshot(&self, company_id: DbId) -> Result<OrgSnapshot, CoreError> {
        Ok(self
            .snapshots
            .get(&company_id)
            .cloned()
            .unwrap_or_else(|| OrgSnapshot::new(company_id)))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the assignee for `step` at the moment it becomes active.
pub fn resolve_assignee(
    step: &WorkflowStep,
    instance: &WorkflowInstance,
    template: &WorkflowTemplate,
    org: &dyn OrgLookup,
) -> Option<DbId> {
    if let Some(explicit) = template.step(&step.id).and_then(|s| s.assignee_id) {
        return Some(explicit);
    }
    let role = step.assignee_role.as_deref()?;
    let related = instance.related_entity();
    org.resolve_role(role, related.as_ref(), instance.company_id)
        .or_else(|| template.default_assignee(role))
}
