//! Application context: wires configuration, storage, integration clients
//! and the background worker together.

use std::sync::Arc;
use std::time::Duration;

use leadsync_core::{ApplicationLog, BillingApi, CrmApi, JobStore, SyncService, SyncServiceConfig, TaskQueue};
use leadsync_domain::{Config, Result};
use leadsync_infra::{
    DbManager, MaxioClient, SqliteApplicationLog, SqliteJobRepository, SqliteTaskQueue,
    SyncWorker, SyncWorkerConfig, VtigerClient,
};

use crate::middleware::rate_limit::RateLimiter;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: Arc<DbManager>,
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub crm: Arc<dyn CrmApi>,
    pub billing: Arc<dyn BillingApi>,
    pub logs: Arc<dyn ApplicationLog>,
    pub webhook_limiter: Arc<RateLimiter>,
    pub api_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Build the full dependency graph from configuration. Runs database
    /// migrations and fails fast on integration misconfiguration.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let jobs: Arc<dyn JobStore> = Arc::new(SqliteJobRepository::new(Arc::clone(&db)));
        let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(Arc::clone(&db)));
        let logs: Arc<dyn ApplicationLog> = Arc::new(SqliteApplicationLog::new(Arc::clone(&db)));
        let crm: Arc<dyn CrmApi> = Arc::new(VtigerClient::new(&config.crm)?);
        let billing: Arc<dyn BillingApi> = Arc::new(MaxioClient::new(&config.billing)?);

        let webhook_limiter = Arc::new(RateLimiter::new(
            config.server.webhook_rate_limit,
            Duration::from_secs(config.server.webhook_rate_window_secs),
        ));
        let api_limiter = Arc::new(RateLimiter::new(
            config.server.api_rate_limit,
            Duration::from_secs(config.server.api_rate_window_secs),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            jobs,
            queue,
            crm,
            billing,
            logs,
            webhook_limiter,
            api_limiter,
        })
    }

    /// Build the background worker that drains the task queue.
    pub fn make_worker(&self) -> SyncWorker {
        let service = SyncService::new(
            Arc::clone(&self.jobs),
            Arc::clone(&self.crm),
            Arc::clone(&self.billing),
            SyncServiceConfig {
                product_handle: self.config.billing.default_product_handle.clone(),
            },
        );

        let queue_cfg = &self.config.queue;
        SyncWorker::new(
            Arc::clone(&self.queue),
            Arc::new(service),
            SyncWorkerConfig {
                concurrency: queue_cfg.concurrency,
                poll_interval: Duration::from_millis(queue_cfg.poll_interval_ms),
                max_attempts: queue_cfg.max_attempts,
                backoff_base: Duration::from_millis(queue_cfg.backoff_base_ms),
                keep_completed: queue_cfg.keep_completed,
                keep_failed: queue_cfg.keep_failed,
                ..Default::default()
            },
        )
    }
}
