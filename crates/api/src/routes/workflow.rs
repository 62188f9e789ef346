use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workflow;
use crate::state::AppState;

/// ```text
/// POST   /                    create_workflow
/// GET    /{id}                get_workflow
/// POST   /{id}/advance        advance_workflow
/// POST   /{id}/enter-next     enter_next_step
/// POST   /{id}/pause          pause_workflow
/// POST   /{id}/resume         resume_workflow
/// POST   /{id}/cancel         cancel_workflow
/// POST   /{id}/reject         reject_workflow
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(workflow::create_workflow))
        .route("/{id}", get(workflow::get_workflow))
        .route("/{id}/advance", post(workflow::advance_workflow))
        .route("/{id}/enter-next", post(workflow::enter_next_step))
        .route("/{id}/pause", post(workflow::pause_workflow))
        .route("/{id}/resume", post(workflow::resume_workflow))
        .route("/{id}/cancel", post(workflow::cancel_workflow))
        .route("/{id}/reject", post(workflow::reject_workflow))
}
