//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PRODUCT_HANDLE;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub crm: CrmConfig,
    pub billing: BillingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Static bearer token for the onboarding API.
    #[serde(skip_serializing)]
    pub api_token: String,
    /// Shared secret compared against the webhook signature header.
    #[serde(skip_serializing)]
    pub webhook_secret: String,
    /// Webhook requests allowed per IP per window.
    pub webhook_rate_limit: u32,
    pub webhook_rate_window_secs: u64,
    /// Onboarding API requests allowed per IP per window.
    pub api_rate_limit: u32,
    pub api_rate_window_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Task queue and worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum sync tasks processed concurrently.
    pub concurrency: usize,
    /// Total attempts per task (initial try + retries).
    pub max_attempts: i32,
    /// Base delay for exponential retry backoff, in milliseconds.
    pub backoff_base_ms: u64,
    /// Interval between queue polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Completed task rows retained for inspection.
    pub keep_completed: usize,
    /// Failed task rows retained for inspection.
    pub keep_failed: usize,
}

/// CRM (vTiger) API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub access_key: String,
    pub timeout_secs: u64,
}

/// Billing (Maxio) API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_secs: u64,
    pub default_product_handle: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_token: String::new(),
            webhook_secret: String::new(),
            webhook_rate_limit: 10,
            webhook_rate_window_secs: 60,
            api_rate_limit: 50,
            api_rate_window_secs: 900,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "leadsync.db".to_string(), pool_size: 8 }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            backoff_base_ms: 2_000,
            poll_interval_ms: 1_000,
            keep_completed: 100,
            keep_failed: 50,
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            access_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            default_product_handle: DEFAULT_PRODUCT_HANDLE.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
            crm: CrmConfig::default(),
            billing: BillingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_queue_contract() {
        let config = QueueConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base_ms, 2_000);
        assert_eq!(config.keep_completed, 100);
        assert_eq!(config.keep_failed, 50);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = Config::default();
        config.server.api_token = "secret-token".into();
        config.crm.access_key = "crm-key".into();
        config.billing.api_key = "billing-key".into();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("crm-key"));
        assert!(!json.contains("billing-key"));
    }
}
