use axum::routing::get;
use axum::Router;

use crate::handlers::template;
use crate::state::AppState;

/// ```text
/// GET    /        list_templates
/// POST   /        create_template
/// GET    /{id}    get_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(template::list_templates).post(template::create_template))
        .route("/{id}", get(template::get_template))
}
