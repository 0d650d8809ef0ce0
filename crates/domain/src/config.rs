//! Configuration structures
//!
//! Loaded by `carebridge-infra`'s config loader from environment variables or
//! a JSON/TOML file. The structs here stay dumb: validation happens at the
//! loader boundary.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub emr: EmrConfig,
    pub sync: SyncConfig,
    pub server: ServerConfig,
}

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

/// External EMR provider settings (OAuth2 authorization-code flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmrConfig {
    /// Provider identifier persisted alongside credentials (e.g. "elation")
    pub provider: String,
    /// Base URL of the EMR REST API
    pub api_base_url: String,
    /// OAuth authorization endpoint (consent page)
    pub authorization_endpoint: String,
    /// OAuth token endpoint (code exchange and refresh)
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Scopes requested at authorization time
    pub scopes: Vec<String>,
}

/// Synchronization policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hard ceiling on pages fetched per entity type
    pub max_pages: u32,
    /// Courtesy delay between consecutive page fetches, in milliseconds
    pub page_delay_ms: u64,
    /// Overall budget for a full catalog sync, in seconds. `None` = unbounded.
    pub overall_timeout_secs: Option<u64>,
    /// Shared secret expected from the scheduler trigger
    pub scheduler_secret: String,
    /// Interval between scheduled full syncs, in seconds (0 disables)
    pub interval_secs: u64,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1:8080"
    pub bind_addr: String,
}

impl SyncConfig {
    /// Defaults per pagination policy: 100-page ceiling, 150 ms between pages.
    pub fn with_secret(scheduler_secret: impl Into<String>) -> Self {
        Self {
            max_pages: 100,
            page_delay_ms: 150,
            overall_timeout_secs: None,
            scheduler_secret: scheduler_secret.into(),
            interval_secs: 0,
        }
    }
}
