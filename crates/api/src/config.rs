use hrflow_core::workflow::{EngineConfig, HoldMode, DEFAULT_MAX_SAVE_ATTEMPTS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Load/apply/save attempts per workflow operation before giving up
    /// with a version conflict (default: `3`).
    pub max_save_attempts: u32,
    /// What happens after a step is completed without `advance_to_next`.
    pub hold_mode: HoldMode,
    /// IM bot webhook for notifications. Notifications are only logged when unset.
    pub notify_webhook_url: Option<String>,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `WORKFLOW_MAX_SAVE_ATTEMPTS` | `3`                     |
    /// | `WORKFLOW_HOLD_MODE`         | `await_enter_next`      |
    /// | `NOTIFY_WEBHOOK_URL`         | unset                   |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_save_attempts: u32 = std::env::var("WORKFLOW_MAX_SAVE_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_SAVE_ATTEMPTS.to_string())
            .parse()
            .expect("WORKFLOW_MAX_SAVE_ATTEMPTS must be a valid u32");
        assert!(max_save_attempts > 0, "WORKFLOW_MAX_SAVE_ATTEMPTS must be at least 1");

        let hold_mode = std::env::var("WORKFLOW_HOLD_MODE")
            .map(|v| {
                HoldMode::from_str_config(v.trim())
                    .unwrap_or_else(|e| panic!("Invalid WORKFLOW_HOLD_MODE: {e}"))
            })
            .unwrap_or_default();

        let notify_webhook_url = std::env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_save_attempts,
            hold_mode,
            notify_webhook_url,
            jwt,
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            hold_mode: self.hold_mode,
        }
    }
}
