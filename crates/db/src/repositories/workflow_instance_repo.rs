//! Repository for the `workflow_instances` table.
//!
//! Writes after the initial insert go through [`WorkflowInstanceRepo::update_if_version`],
//! which only lands when the row is still at the caller's version.

use hrflow_core::types::DbId;
use hrflow_core::workflow::instance::WorkflowInstance;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::workflow::WorkflowInstanceRow;

const COLUMNS: &str = "\
    id, company_id, template_id, template_name, template_version, workflow_type, \
    name, description, status, steps, current_step_index, initiator_id, \
    initiator_name, related_entity_type, related_entity_id, related_entity_name, \
    form_data, variables, priority, due_date, start_date, end_date, warnings, \
    version, created_at, updated_at";

pub struct WorkflowInstanceRepo;

impl WorkflowInstanceRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowInstanceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_instances WHERE id = $1");
        sqlx::query_as::<_, WorkflowInstanceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new instance at version 1.
    pub async fn insert(
        pool: &PgPool,
        instance: &WorkflowInstance,
    ) -> Result<WorkflowInstanceRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_instances \
                (company_id, template_id, template_name, template_version, workflow_type, \
                 name, description, status, steps, current_step_index, initiator_id, \
                 initiator_name, related_entity_type, related_entity_id, related_entity_name, \
                 form_data, variables, priority, due_date, start_date, end_date, warnings, \
                 version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19, $20, $21, $22, 1, $23, $24) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowInstanceRow>(&query)
            .bind(instance.company_id)
            .bind(instance.template_id)
            .bind(&instance.template_name)
            .bind(instance.template_version)
            .bind(instance.workflow_type.as_str())
            .bind(&instance.name)
            .bind(&instance.description)
            .bind(instance.status.as_str())
            .bind(Json(&instance.steps))
            .bind(instance.current_step_index)
            .bind(instance.initiator_id)
            .bind(&instance.initiator_name)
            .bind(&instance.related_entity_type)
            .bind(instance.related_entity_id)
            .bind(&instance.related_entity_name)
            .bind(Json(&instance.form_data))
            .bind(Json(&instance.variables))
            .bind(instance.priority.as_str())
            .bind(instance.due_date)
            .bind(instance.start_date)
            .bind(instance.end_date)
            .bind(Json(&instance.warnings))
            .bind(instance.created_at)
            .bind(instance.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Overwrite the mutable state if the stored version equals `expected_version`.
    ///
    /// Returns `false` when no row matched: either the instance does not
    /// exist or another writer got there first.
    pub async fn update_if_version(
        pool: &PgPool,
        instance: &WorkflowInstance,
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_instances SET \
                name = $3, description = $4, status = $5, steps = $6, \
                current_step_index = $7, form_data = $8, variables = $9, \
                priority = $10, due_date = $11, start_date = $12, end_date = $13, \
                warnings = $14, updated_at = $15, version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(instance.id)
        .bind(expected_version)
        .bind(&instance.name)
        .bind(&instance.description)
        .bind(instance.status.as_str())
        .bind(Json(&instance.steps))
        .bind(instance.current_step_index)
        .bind(Json(&instance.form_data))
        .bind(Json(&instance.variables))
        .bind(instance.priority.as_str())
        .bind(instance.due_date)
        .bind(instance.start_date)
        .bind(instance.end_date)
        .bind(Json(&instance.warnings))
        .bind(instance.updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workflow_instances WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
