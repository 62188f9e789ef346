//! Handlers for workflow instances.
//!
//! Every mutating handler runs its engine operation through
//! [`run_with_retry`], so a concurrent writer causes a reload and reapply
//! rather than a lost update. Intents are dispatched only after the save
//! succeeded.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use hrflow_core::domain;
use hrflow_core::error::CoreError;
use hrflow_core::roles;
use hrflow_core::types::{DbId, JsonMap, Timestamp};
use hrflow_core::workflow::engine::{self, NewInstance};
use hrflow_core::workflow::instance::can_act_on_step;
use hrflow_core::workflow::store::{run_with_retry, ENTITY_INSTANCE};
use hrflow_core::workflow::{
    Actor, AdvanceCommand, InstanceStatus, OrgSnapshot, Priority, RelatedEntity, Transition,
    WorkflowInstance, WorkflowTemplate, WorkflowType,
};

use crate::error::{AppError, AppResult};
use crate::handlers::template::ensure_template_visible;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Start a workflow from an explicit template or from the latest active
/// template of a type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkflowRequest {
    pub template_id: Option<DbId>,
    pub workflow_type: Option<WorkflowType>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<Timestamp>,
    pub related_entity: Option<RelatedEntity>,
    #[serde(default)]
    pub form_data: JsonMap,
    #[serde(default)]
    pub variables: JsonMap,
    /// Create as `draft`; the first advancement activates it.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdvanceRequest {
    #[validate(length(min = 1, max = 100))]
    pub step_id: String,
    /// Same character limit as `AdvanceCommand::validate`.
    #[validate(length(min = 1, max = 64))]
    pub result: String,
    #[validate(length(max = 4000))]
    pub comments: Option<String>,
    pub form_data: Option<JsonMap>,
    #[serde(default = "default_true")]
    pub advance_to_next: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PauseRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Access checks
// ---------------------------------------------------------------------------

/// Instances of other companies are reported as missing.
fn ensure_same_company(instance: &WorkflowInstance, auth: &AuthUser) -> Result<(), CoreError> {
    if instance.company_id != auth.company_id {
        return Err(CoreError::NotFound {
            entity: ENTITY_INSTANCE,
            id: instance.id,
        });
    }
    Ok(())
}

/// The actor may act on the instance's current step.
///
/// A draft has no current step yet; only its initiator may start it.
fn ensure_can_act(instance: &WorkflowInstance, actor: &Actor) -> Result<(), CoreError> {
    if roles::is_elevated(&actor.role) {
        return Ok(());
    }
    if instance.status == InstanceStatus::Draft {
        return ensure_initiator(instance, actor);
    }
    match instance.current_step() {
        Some(step) if !can_act_on_step(step, actor) => Err(CoreError::Forbidden(format!(
            "Actor {} may not act on step '{}'",
            actor.id, step.id
        ))),
        _ => Ok(()),
    }
}

fn ensure_initiator(instance: &WorkflowInstance, actor: &Actor) -> Result<(), CoreError> {
    if instance.initiator_id == actor.id || roles::is_elevated(&actor.role) {
        return Ok(());
    }
    Err(CoreError::Forbidden(format!(
        "Only the initiator or an HR admin may manage workflow instance {}",
        instance.id
    )))
}

// ---------------------------------------------------------------------------
// Shared transition path
// ---------------------------------------------------------------------------

fn log_warnings(transition: &Transition) {
    for warning in transition.warnings() {
        tracing::warn!(
            instance_id = transition.instance.id,
            warning = %warning,
            "Workflow engine warning"
        );
    }
}

/// Load context, apply `op` with retry on version conflicts, then dispatch.
async fn apply<F>(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
    mut op: F,
) -> AppResult<WorkflowInstance>
where
    F: FnMut(&WorkflowTemplate, &OrgSnapshot, &WorkflowInstance) -> Result<Transition, CoreError>
        + Send,
{
    let current = state.instances.load(id).await?;
    ensure_same_company(&current, auth)?;
    let template = state.templates.get(current.template_id).await?;
    let org = state.org.load_snapshot(current.company_id).await?;

    let transition = run_with_retry(
        state.instances.as_ref(),
        id,
        state.config.max_save_attempts,
        |instance| {
            ensure_same_company(instance, auth)?;
            op(&template, &org, instance)
        },
    )
    .await?;

    log_warnings(&transition);
    state.dispatcher.dispatch(&transition);
    Ok(transition.instance)
}

fn ok(instance: WorkflowInstance) -> Json<DataResponse<WorkflowInstance>> {
    Json(DataResponse { data: instance })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows
pub async fn create_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateWorkflowRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let template = match (input.template_id, input.workflow_type) {
        (Some(template_id), _) => {
            let template = state.templates.get(template_id).await?;
            ensure_template_visible(&template, &auth)?;
            template
        }
        (None, Some(workflow_type)) => state
            .templates
            .latest_active(auth.company_id, workflow_type)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "No active {} template is available",
                    workflow_type.as_str()
                ))
            })?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either template_id or workflow_type is required".into(),
            ))
        }
    };

    let org = state.org.load_snapshot(auth.company_id).await?;

    let mut new = NewInstance::new(auth.actor())
        .for_company(auth.company_id)
        .with_priority(input.priority)
        .with_form_data(input.form_data);
    new.variables = input.variables;
    new.name = input.name;
    new.description = input.description;
    new.due_date = input.due_date;
    if let Some(entity) = input.related_entity {
        new = new.with_related_entity(entity);
    }
    if input.draft {
        new = new.draft();
    }

    let mut transition = engine::create_instance(&template, new, &org)?;
    transition.instance = state.instances.insert(transition.instance).await?;

    tracing::info!(
        user_id = auth.user_id,
        instance_id = transition.instance.id,
        template_id = template.id,
        template_version = template.version,
        status = transition.instance.status.as_str(),
        "Workflow instance created"
    );

    log_warnings(&transition);
    state.dispatcher.dispatch(&transition);

    Ok((StatusCode::CREATED, ok(transition.instance)))
}

/// GET /api/v1/workflows/{id}
pub async fn get_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = state.instances.load(id).await?;
    ensure_same_company(&instance, &auth)?;
    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/advance
///
/// Completes the named step with the caller's result. Domain rules of the
/// instance's workflow type are applied before the engine runs.
pub async fn advance_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AdvanceRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let actor = auth.actor();
    let mut command = AdvanceCommand::new(input.step_id, input.result, actor.clone());
    command.comments = input.comments;
    command.form_data = input.form_data;
    command.advance_to_next = input.advance_to_next;
    let engine_config = state.config.engine();

    let instance = apply(&state, &auth, id, |template, org, instance| {
        ensure_can_act(instance, &actor)?;
        domain::advance(template, instance, &command, org, &engine_config)
    })
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        instance_id = id,
        step_id = %command.step_id,
        result = %command.result,
        status = instance.status.as_str(),
        "Workflow step advanced"
    );

    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/enter-next
///
/// Activates the next eligible step after a held completion.
pub async fn enter_next_step(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let actor = auth.actor();
    let instance = apply(&state, &auth, id, |template, org, instance| {
        ensure_can_act(instance, &actor)?;
        engine::enter_next_step(template, instance, &actor, org)
    })
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        instance_id = id,
        current_step_index = instance.current_step_index,
        "Workflow entered next step"
    );

    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/pause
pub async fn pause_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PauseRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let actor = auth.actor();
    let instance = apply(&state, &auth, id, |_, _, instance| {
        ensure_initiator(instance, &actor)?;
        engine::pause(instance, &actor, input.reason.as_deref())
    })
    .await?;

    tracing::info!(user_id = auth.user_id, instance_id = id, "Workflow paused");
    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/resume
pub async fn resume_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let actor = auth.actor();
    let instance = apply(&state, &auth, id, |_, _, instance| {
        ensure_initiator(instance, &actor)?;
        engine::resume(instance, &actor)
    })
    .await?;

    tracing::info!(user_id = auth.user_id, instance_id = id, "Workflow resumed");
    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/cancel
pub async fn cancel_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let actor = auth.actor();
    let instance = apply(&state, &auth, id, |_, _, instance| {
        ensure_initiator(instance, &actor)?;
        domain::cancel(instance, &input.reason, &actor)
    })
    .await?;

    tracing::info!(user_id = auth.user_id, instance_id = id, "Workflow cancelled");
    Ok(ok(instance))
}

/// POST /api/v1/workflows/{id}/reject
///
/// Rejects on the current step with the audit tag of the workflow type
/// (e.g. `reject_candidate` for recruitment).
pub async fn reject_workflow(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let actor = auth.actor();
    let instance = apply(&state, &auth, id, |_, _, instance| {
        ensure_can_act(instance, &actor)?;
        domain::reject(instance, &input.reason, &actor)
    })
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        instance_id = id,
        workflow_type = instance.workflow_type.as_str(),
        "Workflow rejected"
    );
    Ok(ok(instance))
}
