use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrflow_api::config::ServerConfig;
use hrflow_api::router::build_app_router;
use hrflow_api::state::AppState;
use hrflow_core::workflow::NotificationSink;
use hrflow_db::stores::{PgAuditSink, PgInstanceStore, PgOrgSource, PgTemplateStore};
use hrflow_db::DbPool;
use hrflow_events::{EventBus, EventLogger, IntentDispatcher, LogNotifier, WebhookNotifier};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        hold_mode = config.hold_mode.as_str(),
        max_save_attempts = config.max_save_attempts,
        "Loaded server configuration"
    );

    let pool = connect_database().await;

    let event_bus = Arc::new(EventBus::default());
    let logger = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    let state = build_state(&config, pool, Arc::clone(&event_bus));
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be an IP address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Dropping the last bus handle closes the channel and ends the logger.
    drop(event_bus);
    if tokio::time::timeout(Duration::from_secs(5), logger).await.is_err() {
        tracing::warn!("Event logger did not stop within 5s");
    }
    tracing::info!("Shutdown complete");
}

async fn connect_database() -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = hrflow_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    hrflow_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    hrflow_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready, migrations applied");
    pool
}

fn notifier(config: &ServerConfig) -> Arc<dyn NotificationSink> {
    let Some(url) = &config.notify_webhook_url else {
        tracing::info!("NOTIFY_WEBHOOK_URL not set, notifications are only logged");
        return Arc::new(LogNotifier);
    };
    let webhook =
        WebhookNotifier::new(url.clone()).expect("Failed to build notification webhook client");
    tracing::info!(url = %webhook.url(), "Notifications delivered via webhook");
    Arc::new(webhook)
}

fn build_state(config: &ServerConfig, pool: DbPool, bus: Arc<EventBus>) -> AppState {
    let dispatcher = IntentDispatcher::new(
        Arc::new(PgAuditSink::new(pool.clone())),
        notifier(config),
        bus,
    );
    AppState {
        pool: Some(pool.clone()),
        config: Arc::new(config.clone()),
        instances: Arc::new(PgInstanceStore::new(pool.clone())),
        templates: Arc::new(PgTemplateStore::new(pool.clone())),
        org: Arc::new(PgOrgSource::new(pool)),
        dispatcher: Arc::new(dispatcher),
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT received, shutting down"),
            _ = term.recv() => tracing::info!("SIGTERM received, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Ctrl-C received, shutting down");
    }
}
