//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If required variables are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Required:
//! - `LEADSYNC_CRM_BASE_URL`, `LEADSYNC_CRM_USERNAME`, `LEADSYNC_CRM_ACCESS_KEY`
//! - `LEADSYNC_BILLING_BASE_URL`, `LEADSYNC_BILLING_API_KEY`
//! - `LEADSYNC_API_TOKEN`, `LEADSYNC_WEBHOOK_SECRET`
//!
//! Optional (defaults apply):
//! - `LEADSYNC_HOST`, `LEADSYNC_PORT`
//! - `LEADSYNC_DB_PATH`, `LEADSYNC_DB_POOL_SIZE`
//! - `LEADSYNC_QUEUE_CONCURRENCY`, `LEADSYNC_QUEUE_MAX_ATTEMPTS`,
//!   `LEADSYNC_QUEUE_BACKOFF_BASE_MS`, `LEADSYNC_QUEUE_POLL_INTERVAL_MS`
//! - `LEADSYNC_PRODUCT_HANDLE`
//!
//! ## File Locations
//! The loader probes `./config.{json,toml}` and `./leadsync.{json,toml}` in
//! the working directory, two parent directories, and next to the executable.

use std::path::{Path, PathBuf};

use leadsync_domain::{
    BillingConfig, Config, CrmConfig, DatabaseConfig, LeadSyncError, QueueConfig, Result,
    ServerConfig,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `LeadSyncError::Config` if configuration cannot be loaded from
/// either source, the file format is invalid, or required fields are missing.
pub fn load() -> Result<Config> {
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
/// Required variables must be present; optional ones fall back to the
/// defaults in [`Config`].
///
/// # Errors
/// Returns `LeadSyncError::Config` if required variables are missing or
/// have invalid values.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();

    let server = ServerConfig {
        host: env_or("LEADSYNC_HOST", defaults.server.host),
        port: env_parse("LEADSYNC_PORT", defaults.server.port)?,
        api_token: env_var("LEADSYNC_API_TOKEN")?,
        webhook_secret: env_var("LEADSYNC_WEBHOOK_SECRET")?,
        webhook_rate_limit: env_parse(
            "LEADSYNC_WEBHOOK_RATE_LIMIT",
            defaults.server.webhook_rate_limit,
        )?,
        webhook_rate_window_secs: env_parse(
            "LEADSYNC_WEBHOOK_RATE_WINDOW_SECS",
            defaults.server.webhook_rate_window_secs,
        )?,
        api_rate_limit: env_parse("LEADSYNC_API_RATE_LIMIT", defaults.server.api_rate_limit)?,
        api_rate_window_secs: env_parse(
            "LEADSYNC_API_RATE_WINDOW_SECS",
            defaults.server.api_rate_window_secs,
        )?,
    };

    let database = DatabaseConfig {
        path: env_or("LEADSYNC_DB_PATH", defaults.database.path),
        pool_size: env_parse("LEADSYNC_DB_POOL_SIZE", defaults.database.pool_size)?,
    };

    let queue = QueueConfig {
        concurrency: env_parse("LEADSYNC_QUEUE_CONCURRENCY", defaults.queue.concurrency)?,
        max_attempts: env_parse("LEADSYNC_QUEUE_MAX_ATTEMPTS", defaults.queue.max_attempts)?,
        backoff_base_ms: env_parse(
            "LEADSYNC_QUEUE_BACKOFF_BASE_MS",
            defaults.queue.backoff_base_ms,
        )?,
        poll_interval_ms: env_parse(
            "LEADSYNC_QUEUE_POLL_INTERVAL_MS",
            defaults.queue.poll_interval_ms,
        )?,
        keep_completed: env_parse("LEADSYNC_QUEUE_KEEP_COMPLETED", defaults.queue.keep_completed)?,
        keep_failed: env_parse("LEADSYNC_QUEUE_KEEP_FAILED", defaults.queue.keep_failed)?,
    };

    let crm = CrmConfig {
        base_url: env_var("LEADSYNC_CRM_BASE_URL")?,
        username: env_var("LEADSYNC_CRM_USERNAME")?,
        access_key: env_var("LEADSYNC_CRM_ACCESS_KEY")?,
        timeout_secs: env_parse("LEADSYNC_CRM_TIMEOUT_SECS", defaults.crm.timeout_secs)?,
    };

    let billing = BillingConfig {
        base_url: env_var("LEADSYNC_BILLING_BASE_URL")?,
        api_key: env_var("LEADSYNC_BILLING_API_KEY")?,
        timeout_secs: env_parse("LEADSYNC_BILLING_TIMEOUT_SECS", defaults.billing.timeout_secs)?,
        default_product_handle: env_or(
            "LEADSYNC_PRODUCT_HANDLE",
            defaults.billing.default_product_handle,
        ),
    };

    Ok(Config { server, database, queue, crm, billing })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `LeadSyncError::Config` if no file is found, the format is
/// invalid, or required fields are missing.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LeadSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            LeadSyncError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LeadSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LeadSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LeadSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(LeadSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, two parent levels, and the executable's
/// directory; returns the first config file found.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("leadsync.json"),
            cwd.join("leadsync.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("leadsync.json"),
                exe_dir.join("leadsync.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        LeadSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| LeadSyncError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
