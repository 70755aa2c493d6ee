//! Configuration types.

use std::time::Duration;

/// Desk configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Path to the workflow database. `None` uses an in-memory store.
    pub db_path: Option<String>,
    /// Bound applied to every external connector call. Expiry degrades
    /// to a stage failure, never a hung pipeline.
    pub connector_timeout: Duration,
    /// Default page size for workflow listings.
    pub default_list_limit: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: Some("./data/ops-desk.db".to_string()),
            connector_timeout: Duration::from_secs(10),
            default_list_limit: 50,
        }
    }
}

impl DeskConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let bind_addr = std::env::var("OPS_DESK_ADDR").unwrap_or(defaults.bind_addr);
        let db_path = match std::env::var("OPS_DESK_DB_PATH") {
            Ok(p) if p == ":memory:" => None,
            Ok(p) => Some(p),
            Err(_) => defaults.db_path,
        };
        let connector_timeout = std::env::var("OPS_DESK_CONNECTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.connector_timeout);

        Self {
            bind_addr,
            db_path,
            connector_timeout,
            default_list_limit: defaults.default_list_limit,
        }
    }
}
