//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, COMPANY_ID};
use hrflow_core::workflow::{HoldMode, OrgSnapshot};

#[tokio::test]
async fn health_check_returns_ok_without_database() {
    let app = build_test_app(OrgSnapshot::new(COMPANY_ID), HoldMode::default());
    let response = get(app.router(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["db_healthy"].is_null());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(OrgSnapshot::new(COMPANY_ID), HoldMode::default());
    let response = get(app.router(), "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app(OrgSnapshot::new(COMPANY_ID), HoldMode::default());
    let response = get(app.router(), "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("response must carry x-request-id");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    let app = build_test_app(OrgSnapshot::new(COMPANY_ID), HoldMode::default());
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/workflows")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert!(response.headers().contains_key("x-request-id"));
}
