//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CAREBRIDGE_DB_PATH`: Database file path
//! - `CAREBRIDGE_DB_POOL_SIZE`: Connection pool size (default 4)
//! - `CAREBRIDGE_EMR_PROVIDER`: Provider identifier, e.g. "elation"
//! - `CAREBRIDGE_EMR_API_BASE_URL`: Base URL of the EMR REST API
//! - `CAREBRIDGE_EMR_AUTHORIZATION_ENDPOINT`: OAuth consent endpoint
//! - `CAREBRIDGE_EMR_TOKEN_ENDPOINT`: OAuth token endpoint
//! - `CAREBRIDGE_EMR_CLIENT_ID` / `CAREBRIDGE_EMR_CLIENT_SECRET`
//! - `CAREBRIDGE_EMR_REDIRECT_URI`: Registered redirect URI
//! - `CAREBRIDGE_EMR_SCOPES`: Space-separated scope list
//! - `CAREBRIDGE_SYNC_MAX_PAGES`: Page ceiling per entity (default 100)
//! - `CAREBRIDGE_SYNC_PAGE_DELAY_MS`: Delay between pages (default 150)
//! - `CAREBRIDGE_SYNC_TIMEOUT_SECS`: Overall sync budget (optional)
//! - `CAREBRIDGE_SYNC_INTERVAL`: Seconds between scheduled syncs (0 disables)
//! - `CAREBRIDGE_SCHEDULER_SECRET`: Shared secret for the scheduler trigger
//! - `CAREBRIDGE_BIND_ADDR`: HTTP bind address (default 127.0.0.1:8080)

use std::path::{Path, PathBuf};

use carebridge_domain::{
    CareBridgeError, Config, DatabaseConfig, EmrConfig, Result, ServerConfig, SyncConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `CareBridgeError::Config` if configuration cannot be loaded from
/// either source.
pub fn load_config() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `CareBridgeError::Config` if required variables are missing or
/// have invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("CAREBRIDGE_DB_PATH")?;
    let db_pool_size = env_parse("CAREBRIDGE_DB_POOL_SIZE", 4u32)?;

    let emr = EmrConfig {
        provider: env_var("CAREBRIDGE_EMR_PROVIDER")?,
        api_base_url: env_var("CAREBRIDGE_EMR_API_BASE_URL")?,
        authorization_endpoint: env_var("CAREBRIDGE_EMR_AUTHORIZATION_ENDPOINT")?,
        token_endpoint: env_var("CAREBRIDGE_EMR_TOKEN_ENDPOINT")?,
        client_id: env_var("CAREBRIDGE_EMR_CLIENT_ID")?,
        client_secret: env_var("CAREBRIDGE_EMR_CLIENT_SECRET")?,
        redirect_uri: env_var("CAREBRIDGE_EMR_REDIRECT_URI")?,
        scopes: env_var("CAREBRIDGE_EMR_SCOPES")?
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    };

    let sync = SyncConfig {
        max_pages: env_parse("CAREBRIDGE_SYNC_MAX_PAGES", 100u32)?,
        page_delay_ms: env_parse("CAREBRIDGE_SYNC_PAGE_DELAY_MS", 150u64)?,
        overall_timeout_secs: env_parse_opt::<u64>("CAREBRIDGE_SYNC_TIMEOUT_SECS")?,
        scheduler_secret: env_var("CAREBRIDGE_SCHEDULER_SECRET")?,
        interval_secs: env_parse("CAREBRIDGE_SYNC_INTERVAL", 0u64)?,
    };

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        emr,
        sync,
        server: ServerConfig {
            bind_addr: std::env::var("CAREBRIDGE_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CareBridgeError::Config` if no file is found or the contents
/// cannot be parsed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CareBridgeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CareBridgeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CareBridgeError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CareBridgeError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CareBridgeError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CareBridgeError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe standard locations for a config file, first hit wins.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("carebridge.json"),
            cwd.join("carebridge.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("carebridge.json"),
                exe_dir.join("carebridge.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CareBridgeError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| CareBridgeError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_parse_opt<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| CareBridgeError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}
