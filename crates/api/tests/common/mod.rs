//! Shared helpers for API integration tests.
//!
//! The app runs on the in-memory stores with the same router and middleware
//! stack as production.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use hrflow_api::auth::jwt::{generate_access_token, JwtConfig};
use hrflow_api::config::ServerConfig;
use hrflow_api::router::build_app_router;
use hrflow_api::state::AppState;
use hrflow_core::types::DbId;
use hrflow_core::workflow::store::{InMemoryInstanceStore, InMemoryTemplateStore};
use hrflow_core::workflow::sink::{MemoryAuditSink, MemoryNotificationSink};
use hrflow_core::workflow::{
    Actor, HoldMode, OrgSnapshot, StaticOrgSource, TemplateStore, WorkflowTemplate,
};
use hrflow_events::{EventBus, IntentDispatcher};

pub const COMPANY_ID: DbId = 1;
pub const OTHER_COMPANY_ID: DbId = 2;

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
    }
}

pub fn test_config(hold_mode: HoldMode) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_save_attempts: 3,
        hold_mode,
        notify_webhook_url: None,
        jwt: test_jwt(),
    }
}

/// A running test application plus handles on its in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub templates: Arc<InMemoryTemplateStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub notifications: Arc<MemoryNotificationSink>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Store a template directly, bypassing the HTTP surface.
    pub async fn seed_template(&self, template: WorkflowTemplate) -> WorkflowTemplate {
        self.templates
            .insert(template)
            .await
            .expect("seeding template should succeed")
    }
}

pub fn build_test_app(org: OrgSnapshot, hold_mode: HoldMode) -> TestApp {
    let config = test_config(hold_mode);
    let templates = Arc::new(InMemoryTemplateStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let notifications = Arc::new(MemoryNotificationSink::new());

    let dispatcher = Arc::new(IntentDispatcher::new(
        audit.clone(),
        notifications.clone(),
        Arc::new(EventBus::default()),
    ));

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        instances: Arc::new(InMemoryInstanceStore::new()),
        templates: templates.clone(),
        org: Arc::new(StaticOrgSource::new([org])),
        dispatcher,
    };

    TestApp {
        router: build_app_router(state, &config),
        templates,
        audit,
        notifications,
    }
}

/// Bearer token for `actor` in `company_id`.
pub fn token_for(actor: &Actor, company_id: DbId) -> String {
    generate_access_token(actor, company_id, &test_jwt()).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
