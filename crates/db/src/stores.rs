//! PostgreSQL implementations of the `hrflow-core` storage and sink traits.

use async_trait::async_trait;
use hrflow_core::error::CoreError;
use hrflow_core::types::DbId;
use hrflow_core::workflow::assignee::{OrgSnapshot, OrgSource};
use hrflow_core::workflow::instance::WorkflowInstance;
use hrflow_core::workflow::sink::{AuditRecord, AuditSink};
use hrflow_core::workflow::status::WorkflowType;
use hrflow_core::workflow::store::{InstanceStore, TemplateStore, ENTITY_INSTANCE, ENTITY_TEMPLATE};
use hrflow_core::workflow::template::{validate_template, WorkflowTemplate};
use sqlx::PgPool;

use crate::into_core_error;
use crate::models::org::{DepartmentRow, EmployeeRow, RoleAssignmentRow};
use crate::repositories::{AuditLogRepo, OrgRepo, WorkflowInstanceRepo, WorkflowTemplateRepo};

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgInstanceStore {
    pool: PgPool,
}

impl PgInstanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceStore for PgInstanceStore {
    async fn load(&self, id: DbId) -> Result<WorkflowInstance, CoreError> {
        WorkflowInstanceRepo::find_by_id(&self.pool, id)
            .await
            .map_err(into_core_error)?
            .ok_or(CoreError::NotFound {
                entity: ENTITY_INSTANCE,
                id,
            })?
            .try_into()
    }

    async fn insert(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, CoreError> {
        let row = WorkflowInstanceRepo::insert(&self.pool, &instance)
            .await
            .map_err(into_core_error)?;
        tracing::debug!(instance_id = row.id, template_id = row.template_id, "Workflow instance inserted");
        row.try_into()
    }

    async fn save(
        &self,
        instance: &WorkflowInstance,
        expected_version: i64,
    ) -> Result<i64, CoreError> {
        let updated = WorkflowInstanceRepo::update_if_version(&self.pool, instance, expected_version)
            .await
            .map_err(into_core_error)?;
        if updated {
            return Ok(expected_version + 1);
        }

        let exists = WorkflowInstanceRepo::exists(&self.pool, instance.id)
            .await
            .map_err(into_core_error)?;
        if !exists {
            return Err(CoreError::NotFound {
                entity: ENTITY_INSTANCE,
                id: instance.id,
            });
        }
        tracing::debug!(
            instance_id = instance.id,
            expected_version,
            "Optimistic concurrency conflict on workflow instance"
        );
        Err(CoreError::VersionConflict {
            entity: ENTITY_INSTANCE,
            id: instance.id,
            expected_version,
        })
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn get(&self, id: DbId) -> Result<WorkflowTemplate, CoreError> {
        WorkflowTemplateRepo::find_by_id(&self.pool, id)
            .await
            .map_err(into_core_error)?
            .ok_or(CoreError::NotFound {
                entity: ENTITY_TEMPLATE,
                id,
            })?
            .try_into()
    }

    async fn list_active(&self, company_id: DbId) -> Result<Vec<WorkflowTemplate>, CoreError> {
        WorkflowTemplateRepo::list_active(&self.pool, company_id)
            .await
            .map_err(into_core_error)?
            .into_iter()
            .map(WorkflowTemplate::try_from)
            .collect()
    }

    async fn latest_active(
        &self,
        company_id: DbId,
        workflow_type: WorkflowType,
    ) -> Result<Option<WorkflowTemplate>, CoreError> {
        WorkflowTemplateRepo::latest_active(&self.pool, company_id, workflow_type)
            .await
            .map_err(into_core_error)?
            .map(WorkflowTemplate::try_from)
            .transpose()
    }

    async fn insert(&self, template: WorkflowTemplate) -> Result<WorkflowTemplate, CoreError> {
        validate_template(&template)?;
        let row = WorkflowTemplateRepo::insert_next_version(&self.pool, &template)
            .await
            .map_err(into_core_error)?;
        tracing::info!(
            template_id = row.id,
            version = row.version,
            workflow_type = %row.workflow_type,
            "Workflow template version created"
        );
        row.try_into()
    }
}

// ---------------------------------------------------------------------------
// Audit sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), CoreError> {
        AuditLogRepo::append(&self.pool, &record)
            .await
            .map_err(into_core_error)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Org directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgOrgSource {
    pool: PgPool,
}

impl PgOrgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Assemble an [`OrgSnapshot`] from directory rows.
pub fn build_snapshot(
    company_id: DbId,
    departments: &[DepartmentRow],
    employees: &[EmployeeRow],
    assignments: &[RoleAssignmentRow],
) -> OrgSnapshot {
    let mut snapshot = OrgSnapshot::new(company_id);
    for dept in departments {
        if let Some(parent) = dept.parent_id {
            snapshot = snapshot.with_parent(dept.id, parent);
        }
    }
    for emp in employees {
        if let Some(dept) = emp.department_id {
            snapshot = snapshot.with_employee(emp.id, dept);
        }
    }
    for grant in assignments {
        snapshot = match grant.department_id {
            Some(dept) => snapshot.with_department_role(dept, &grant.role_name, grant.employee_id),
            None => snapshot.with_company_role(&grant.role_name, grant.employee_id),
        };
    }
    snapshot
}

#[async_trait]
impl OrgSource for PgOrgSource {
    async fn load_snapshot(&self, company_id: DbId) -> Result<OrgSnapshot, CoreError> {
        let departments = OrgRepo::list_departments(&self.pool, company_id)
            .await
            .map_err(into_core_error)?;
        let employees = OrgRepo::list_employees(&self.pool, company_id)
            .await
            .map_err(into_core_error)?;
        let assignments = OrgRepo::list_role_assignments(&self.pool, company_id)
            .await
            .map_err(into_core_error)?;
        Ok(build_snapshot(company_id, &departments, &employees, &assignments))
    }
}
