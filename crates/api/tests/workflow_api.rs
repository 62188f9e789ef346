//! HTTP-level integration tests for the workflow instance endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value};

use common::{
    body_json, build_test_app, get_auth, post_json, post_json_auth, token_for, TestApp,
    COMPANY_ID, OTHER_COMPANY_ID,
};
use hrflow_core::audit::action_types;
use hrflow_core::roles::{ROLE_EMPLOYEE, ROLE_HR, ROLE_HR_ADMIN};
use hrflow_core::workflow::{
    Actor, HoldMode, OrgSnapshot, TemplateStep, WorkflowTemplate, WorkflowType,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn employee() -> Actor {
    Actor::new(10, "Erin", ROLE_EMPLOYEE)
}

fn colleague() -> Actor {
    Actor::new(11, "Cole", ROLE_EMPLOYEE)
}

fn hr() -> Actor {
    Actor::new(20, "Hana", ROLE_HR)
}

fn hr_admin() -> Actor {
    Actor::new(30, "Ada", ROLE_HR_ADMIN)
}

fn org() -> OrgSnapshot {
    OrgSnapshot::new(COMPANY_ID).with_company_role(ROLE_HR, hr().id)
}

/// Two steps: the employee submits, then whoever holds `hr` reviews.
fn transfer_template() -> WorkflowTemplate {
    let now = Utc::now();
    WorkflowTemplate {
        id: 0,
        company_id: COMPANY_ID,
        name: "Transfer request".into(),
        workflow_type: WorkflowType::Transfer,
        version: 1,
        is_active: true,
        is_public: false,
        steps: vec![
            TemplateStep::new("request", "Request").with_assignee(employee().id),
            TemplateStep::new("hr_review", "HR review").with_role(ROLE_HR),
        ],
        default_assignees: Default::default(),
        conditions: Default::default(),
        created_at: now,
        updated_at: now,
    }
}

async fn setup(hold_mode: HoldMode) -> (TestApp, WorkflowTemplate) {
    let app = build_test_app(org(), hold_mode);
    let template = app.seed_template(transfer_template()).await;
    (app, template)
}

async fn create(app: &TestApp, body: Value, actor: &Actor) -> (StatusCode, Value) {
    let token = token_for(actor, COMPANY_ID);
    let response = post_json_auth(app.router(), "/api/v1/workflows", body, &token).await;
    let status = response.status();
    (status, body_json(response).await)
}

async fn action(
    app: &TestApp,
    id: i64,
    verb: &str,
    body: Value,
    actor: &Actor,
) -> (StatusCode, Value) {
    let token = token_for(actor, COMPANY_ID);
    let uri = format!("/api/v1/workflows/{id}/{verb}");
    let response = post_json_auth(app.router(), &uri, body, &token).await;
    let status = response.status();
    (status, body_json(response).await)
}

fn advance_body(step_id: &str) -> Value {
    json!({ "step_id": step_id, "result": "approved" })
}

/// Dispatch runs in the background; wait until `count` audit entries landed.
async fn audit_actions(app: &TestApp, count: usize) -> Vec<String> {
    for _ in 0..100 {
        let records = app.audit.records().await;
        if records.len() >= count {
            return records.into_iter().map(|r| r.action_type).collect();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} audit entries");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_advance_and_complete() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;

    let (status, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &json["data"];
    let id = data["id"].as_i64().unwrap();
    assert_eq!(data["status"], "active");
    assert_eq!(data["version"], 1);
    assert_eq!(data["company_id"], COMPANY_ID);
    assert_eq!(data["steps"][0]["status"], "in_progress");
    assert_eq!(data["steps"][1]["status"], "pending");

    let (status, json) = action(&app, id, "advance", advance_body("request"), &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["steps"][0]["status"], "completed");
    assert_eq!(json["data"]["steps"][1]["status"], "in_progress");
    assert_eq!(json["data"]["steps"][1]["assignee_id"], hr().id);
    assert_eq!(json["data"]["version"], 2);

    let (status, json) = action(&app, id, "advance", advance_body("hr_review"), &hr()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");
    assert!(json["data"]["end_date"].is_string());

    let actions = audit_actions(&app, 4).await;
    assert_eq!(
        actions,
        vec![
            action_types::CREATE_WORKFLOW,
            action_types::ADVANCE_WORKFLOW_STEP,
            action_types::ADVANCE_WORKFLOW_STEP,
            action_types::COMPLETE_WORKFLOW,
        ]
    );
}

#[tokio::test]
async fn get_returns_instance_for_same_company_only() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/workflows/{id}");

    let response = get_auth(app.router(), &uri, &token_for(&employee(), COMPANY_ID)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let outsider = token_for(&employee(), OTHER_COMPANY_ID);
    let response = get_auth(app.router(), &uri, &outsider).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_by_type_uses_latest_active_version() {
    let (app, _) = setup(HoldMode::AwaitEnterNext).await;
    let second = app.seed_template(transfer_template()).await;
    assert_eq!(second.version, 2);

    let (status, json) = create(&app, json!({ "workflow_type": "transfer" }), &employee()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["template_version"], 2);
}

#[tokio::test]
async fn create_without_template_reference_is_bad_request() {
    let (app, _) = setup(HoldMode::AwaitEnterNext).await;
    let (status, json) = create(&app, json!({}), &employee()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn draft_starts_on_first_advance() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(
        &app,
        json!({ "template_id": template.id, "draft": true }),
        &employee(),
    )
    .await;
    assert_eq!(json["data"]["status"], "draft");
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(&app, id, "advance", advance_body("request"), &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(json["data"]["steps"][1]["status"], "in_progress");
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn advancing_wrong_step_is_step_mismatch() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(&app, id, "advance", advance_body("hr_review"), &employee()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "STEP_MISMATCH");
}

#[tokio::test]
async fn non_assignee_cannot_advance() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(&app, id, "advance", advance_body("request"), &colleague()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let (app, _) = setup(HoldMode::AwaitEnterNext).await;
    let response = post_json(app.router(), "/api/v1/workflows", json!({ "template_id": 1 })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_instance_is_not_found() {
    let (app, _) = setup(HoldMode::AwaitEnterNext).await;
    let (status, json) = action(&app, 999, "advance", advance_body("request"), &employee()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn advance_on_completed_instance_is_invalid_state() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();
    action(&app, id, "advance", advance_body("request"), &employee()).await;
    action(&app, id, "advance", advance_body("hr_review"), &hr()).await;

    let (status, json) = action(&app, id, "advance", advance_body("hr_review"), &hr()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_STATE");
}

// ---------------------------------------------------------------------------
// Hold, pause, terminate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn held_step_waits_for_enter_next() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let body = json!({ "step_id": "request", "result": "submitted", "advance_to_next": false });
    let (status, json) = action(&app, id, "advance", body, &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["steps"][0]["status"], "completed");
    assert_eq!(json["data"]["steps"][1]["status"], "pending");

    let (status, _) = action(&app, id, "advance", advance_body("request"), &employee()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = action(&app, id, "enter-next", json!({}), &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["steps"][1]["status"], "in_progress");
}

#[tokio::test]
async fn paused_instance_rejects_advance_until_resumed() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(&app, id, "pause", json!({ "reason": "on leave" }), &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "paused");

    let (status, json) = action(&app, id, "advance", advance_body("request"), &employee()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_STATE");

    let (status, json) = action(&app, id, "resume", json!({}), &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "active");
}

#[tokio::test]
async fn only_initiator_or_admin_can_cancel() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();
    let reason = json!({ "reason": "no longer needed" });

    let (status, _) = action(&app, id, "cancel", reason.clone(), &colleague()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = action(&app, id, "cancel", reason, &employee()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["steps"][0]["status"], "skipped");
}

#[tokio::test]
async fn cancel_requires_reason() {
    let (app, template) = setup(HoldMode::AwaitEnterNext).await;
    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(&app, id, "cancel", json!({ "reason": "" }), &employee()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn recruitment_reject_uses_candidate_tag() {
    let app = build_test_app(org(), HoldMode::AwaitEnterNext);
    let mut template = transfer_template();
    template.name = "Hiring".into();
    template.workflow_type = WorkflowType::Recruitment;
    let template = app.seed_template(template).await;

    let (_, json) = create(&app, json!({ "template_id": template.id }), &employee()).await;
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = action(
        &app,
        id,
        "reject",
        json!({ "reason": "position filled" }),
        &hr_admin(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["steps"][0]["metadata"]["result"], "rejected");

    let actions = audit_actions(&app, 2).await;
    assert_eq!(actions[1], action_types::REJECT_CANDIDATE);
}
