//! Handlers for workflow templates.
//!
//! Templates are immutable once stored; "editing" one means creating the
//! next version of its lineage.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use hrflow_core::audit::{action_to_category, action_types, RESOURCE_WORKFLOW_TEMPLATE};
use hrflow_core::error::CoreError;
use hrflow_core::types::DbId;
use hrflow_core::workflow::store::ENTITY_TEMPLATE;
use hrflow_core::workflow::{
    AuditRecord, StepCondition, TemplateStep, WorkflowTemplate, WorkflowType,
};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireHrAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub is_public: bool,
    #[validate(length(min = 1))]
    pub steps: Vec<TemplateStep>,
    #[serde(default)]
    pub default_assignees: BTreeMap<String, Vec<DbId>>,
    #[serde(default)]
    pub conditions: BTreeMap<String, StepCondition>,
}

/// Own templates and public templates are visible; anything else is
/// reported as missing.
pub(crate) fn ensure_template_visible(
    template: &WorkflowTemplate,
    auth: &AuthUser,
) -> Result<(), CoreError> {
    if template.company_id == auth.company_id || template.is_public {
        return Ok(());
    }
    Err(CoreError::NotFound {
        entity: ENTITY_TEMPLATE,
        id: template.id,
    })
}

/// GET /api/v1/workflow-templates
pub async fn list_templates(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let templates = state.templates.list_active(auth.company_id).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/workflow-templates/{id}
pub async fn get_template(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = state.templates.get(id).await?;
    ensure_template_visible(&template, &auth)?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/workflow-templates
///
/// Stores the next version of the `(company, type, name)` lineage.
pub async fn create_template(
    RequireHrAdmin(auth): RequireHrAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let now = Utc::now();
    let draft = WorkflowTemplate {
        id: 0,
        company_id: auth.company_id,
        name: input.name,
        workflow_type: input.workflow_type,
        // Replaced by the store with the lineage's next version.
        version: 1,
        is_active: true,
        is_public: input.is_public,
        steps: input.steps,
        default_assignees: input.default_assignees,
        conditions: input.conditions,
        created_at: now,
        updated_at: now,
    };

    let template = state.templates.insert(draft).await?;

    tracing::info!(
        user_id = auth.user_id,
        template_id = template.id,
        version = template.version,
        workflow_type = template.workflow_type.as_str(),
        "Workflow template created"
    );

    state.dispatcher.dispatch_audit(AuditRecord {
        company_id: template.company_id,
        actor_id: auth.user_id,
        actor_name: auth.name.clone(),
        actor_role: auth.role.clone(),
        action_type: action_types::CREATE_TEMPLATE.to_string(),
        category: action_to_category(action_types::CREATE_TEMPLATE).to_string(),
        resource_type: RESOURCE_WORKFLOW_TEMPLATE.to_string(),
        resource_id: template.id,
        changes: json!({
            "name": template.name,
            "workflow_type": template.workflow_type.as_str(),
            "version": template.version,
            "steps": template.steps.len(),
            "is_public": template.is_public,
        }),
        created_at: now,
    });

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}
