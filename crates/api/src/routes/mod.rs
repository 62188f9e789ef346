pub mod health;
pub mod template;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /workflow-templates                 list, create (hr_admin)
/// /workflow-templates/{id}            get
///
/// /workflows                          create
/// /workflows/{id}                     get
/// /workflows/{id}/advance             complete the current step
/// /workflows/{id}/enter-next          activate the next step after a hold
/// /workflows/{id}/pause               pause
/// /workflows/{id}/resume              resume
/// /workflows/{id}/cancel              cancel
/// /workflows/{id}/reject              reject with the type's audit tag
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/workflow-templates", template::router())
        .nest("/workflows", workflow::router())
}
