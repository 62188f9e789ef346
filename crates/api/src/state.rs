use std::sync::Arc;

use hrflow_core::workflow::{InstanceStore, OrgSource, TemplateStore};
use hrflow_events::IntentDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Stores are trait objects so tests can run the full router against the
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    /// Database pool, used only by the health check. `None` when running on
    /// in-memory stores.
    pub pool: Option<hrflow_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub instances: Arc<dyn InstanceStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub org: Arc<dyn OrgSource>,
    /// Delivers audit entries, notifications and bus events after each save.
    pub dispatcher: Arc<IntentDispatcher>,
}
