//! Repository for the `workflow_templates` table.

use hrflow_core::types::DbId;
use hrflow_core::workflow::status::WorkflowType;
use hrflow_core::workflow::template::WorkflowTemplate;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::workflow::WorkflowTemplateRow;

const COLUMNS: &str = "\
    id, company_id, name, workflow_type, version, is_active, is_public, \
    steps, default_assignees, conditions, created_at, updated_at";

pub struct WorkflowTemplateRepo;

impl WorkflowTemplateRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowTemplateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_templates WHERE id = $1");
        sqlx::query_as::<_, WorkflowTemplateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active templates owned by the company or shared publicly.
    pub async fn list_active(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Vec<WorkflowTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_templates \
             WHERE is_active AND (company_id = $1 OR is_public) \
             ORDER BY name, version"
        );
        sqlx::query_as::<_, WorkflowTemplateRow>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Highest active version of a workflow type, preferring the company's own.
    pub async fn latest_active(
        pool: &PgPool,
        company_id: DbId,
        workflow_type: WorkflowType,
    ) -> Result<Option<WorkflowTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_templates \
             WHERE is_active AND workflow_type = $2 AND (company_id = $1 OR is_public) \
             ORDER BY (company_id = $1) DESC, version DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, WorkflowTemplateRow>(&query)
            .bind(company_id)
            .bind(workflow_type.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Insert a new version of the template's lineage.
    ///
    /// The version is computed in the same statement as `max + 1`; a racing
    /// insert of the same version trips `uq_workflow_templates_lineage_version`.
    pub async fn insert_next_version(
        pool: &PgPool,
        template: &WorkflowTemplate,
    ) -> Result<WorkflowTemplateRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_templates \
                (company_id, name, workflow_type, version, is_active, is_public, \
                 steps, default_assignees, conditions) \
             SELECT $1, $2, $3, COALESCE(MAX(version), 0) + 1, $4, $5, $6, $7, $8 \
             FROM workflow_templates \
             WHERE company_id = $1 AND workflow_type = $3 AND name = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowTemplateRow>(&query)
            .bind(template.company_id)
            .bind(&template.name)
            .bind(template.workflow_type.as_str())
            .bind(template.is_active)
            .bind(template.is_public)
            .bind(Json(&template.steps))
            .bind(Json(&template.default_assignees))
            .bind(Json(&template.conditions))
            .fetch_one(pool)
            .await
    }

    pub async fn set_active(pool: &PgPool, id: DbId, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_templates SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
