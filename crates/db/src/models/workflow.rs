//! Row models for `workflow_templates` and `workflow_instances`.
//!
//! Structured columns (steps, assignees, conditions, form data) are JSONB;
//! status-like columns are text and parsed through the core enums.

use std::collections::BTreeMap;

use hrflow_core::error::CoreError;
use hrflow_core::types::{DbId, JsonMap, Timestamp};
use hrflow_core::workflow::condition::StepCondition;
use hrflow_core::workflow::instance::{WorkflowInstance, WorkflowStep};
use hrflow_core::workflow::intent::EngineWarning;
use hrflow_core::workflow::status::{InstanceStatus, Priority, WorkflowType};
use hrflow_core::workflow::template::{TemplateStep, WorkflowTemplate};
use sqlx::types::Json;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowTemplateRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub workflow_type: String,
    pub version: i32,
    pub is_active: bool,
    pub is_public: bool,
    pub steps: Json<Vec<TemplateStep>>,
    pub default_assignees: Json<BTreeMap<String, Vec<DbId>>>,
    pub conditions: Json<BTreeMap<String, StepCondition>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<WorkflowTemplateRow> for WorkflowTemplate {
    type Error = CoreError;

    fn try_from(row: WorkflowTemplateRow) -> Result<Self, Self::Error> {
        Ok(WorkflowTemplate {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            workflow_type: WorkflowType::from_str_db(&row.workflow_type)?,
            version: row.version,
            is_active: row.is_active,
            is_public: row.is_public,
            steps: row.steps.0,
            default_assignees: row.default_assignees.0,
            conditions: row.conditions.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowInstanceRow {
    pub id: DbId,
    pub company_id: DbId,
    pub template_id: DbId,
    pub template_name: String,
    pub template_version: i32,
    pub workflow_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub steps: Json<Vec<WorkflowStep>>,
    pub current_step_index: i32,
    pub initiator_id: DbId,
    pub initiator_name: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<DbId>,
    pub related_entity_name: Option<String>,
    pub form_data: Json<JsonMap>,
    pub variables: Json<JsonMap>,
    pub priority: String,
    pub due_date: Option<Timestamp>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub warnings: Json<Vec<EngineWarning>>,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<WorkflowInstanceRow> for WorkflowInstance {
    type Error = CoreError;

    fn try_from(row: WorkflowInstanceRow) -> Result<Self, Self::Error> {
        Ok(WorkflowInstance {
            id: row.id,
            company_id: row.company_id,
            template_id: row.template_id,
            template_name: row.template_name,
            template_version: row.template_version,
            workflow_type: WorkflowType::from_str_db(&row.workflow_type)?,
            name: row.name,
            description: row.description,
            status: InstanceStatus::from_str_db(&row.status)?,
            steps: row.steps.0,
            current_step_index: row.current_step_index,
            initiator_id: row.initiator_id,
            initiator_name: row.initiator_name,
            related_entity_type: row.related_entity_type,
            related_entity_id: row.related_entity_id,
            related_entity_name: row.related_entity_name,
            form_data: row.form_data.0,
            variables: row.variables.0,
            priority: Priority::from_str_db(&row.priority)?,
            due_date: row.due_date,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
            warnings: row.warnings.0,
        })
    }
}
