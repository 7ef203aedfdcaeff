//! Queue worker for lead-to-billing sync tasks.
//!
//! Polls the durable task queue, runs claimed tasks through the sync
//! pipeline with bounded concurrency, and applies exponential-backoff
//! retry bookkeeping. Join handles are tracked, cancellation is explicit,
//! and every batch runs under a timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use leadsync_core::{SyncService, TaskQueue};
use leadsync_domain::{ClaimedTask, LeadSyncError, Result, SyncTask};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Configuration for the sync worker.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    /// Maximum tasks processed concurrently per tick
    pub concurrency: usize,
    /// Interval between queue polls
    pub poll_interval: Duration,
    /// Timeout for processing a single tick
    pub processing_timeout: Duration,
    /// Total attempts per task (initial try + retries)
    pub max_attempts: i32,
    /// Base delay for exponential retry backoff
    pub backoff_base: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
    /// Completed task rows retained after pruning
    pub keep_completed: usize,
    /// Failed task rows retained after pruning
    pub keep_failed: usize,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            poll_interval: Duration::from_secs(1),
            processing_timeout: Duration::from_secs(300),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            join_timeout: Duration::from_secs(5),
            keep_completed: 100,
            keep_failed: 50,
        }
    }
}

/// Interface for executing one claimed sync task.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Run the full sync sequence for one task.
    async fn process_task(&self, task: &SyncTask) -> Result<()>;
}

#[async_trait]
impl TaskProcessor for SyncService {
    async fn process_task(&self, task: &SyncTask) -> Result<()> {
        self.process(task).await
    }
}

/// Sync worker with explicit lifecycle management.
pub struct SyncWorker {
    queue: Arc<dyn TaskQueue>,
    processor: Arc<dyn TaskProcessor>,
    config: SyncWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Create a new worker with the given configuration.
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn TaskProcessor>,
        config: SyncWorkerConfig,
    ) -> Self {
        Self { queue, processor, config, cancellation: CancellationToken::new(), task_handle: None }
    }

    /// Start the worker, spawning the background processing task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(LeadSyncError::Internal("worker already running".into()));
        }

        info!("starting sync worker");

        self.cancellation = CancellationToken::new();

        let queue = Arc::clone(&self.queue);
        let processor = Arc::clone(&self.processor);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(queue, processor, config, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("sync worker started");

        Ok(())
    }

    /// Stop the worker and wait for the processing task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Err(LeadSyncError::Internal("worker not running".into()));
        }

        info!("stopping sync worker");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("worker task panicked: {}", e);
                    return Err(LeadSyncError::Internal("worker task panicked".into()));
                }
                Err(_) => {
                    warn!("worker task did not complete within timeout");
                    return Err(LeadSyncError::Internal("worker task timeout".into()));
                }
            }
        }

        info!("sync worker stopped");
        self.cancellation = CancellationToken::new();

        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Background processing loop.
    async fn process_loop(
        queue: Arc<dyn TaskQueue>,
        processor: Arc<dyn TaskProcessor>,
        config: SyncWorkerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sync worker process loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.poll_interval) => {
                    match tokio::time::timeout(
                        config.processing_timeout,
                        Self::process_tick(&queue, &processor, &config),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            error!(error = %e, "tick processing failed");
                        }
                        Err(_) => {
                            warn!(
                                timeout_secs = config.processing_timeout.as_secs(),
                                "tick processing timed out"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Claim and process one batch of due tasks.
    ///
    /// Claiming at most `concurrency` tasks and awaiting the whole batch
    /// before the next poll bounds the number of in-flight syncs. Running
    /// rows untouched for longer than the processing timeout are stranded
    /// (process restart, dropped batch) and are re-queued first.
    async fn process_tick(
        queue: &Arc<dyn TaskQueue>,
        processor: &Arc<dyn TaskProcessor>,
        config: &SyncWorkerConfig,
    ) -> Result<()> {
        let stalled_before = Utc::now().timestamp() - config.processing_timeout.as_secs() as i64;
        match queue.reclaim_stale(stalled_before).await {
            Ok(0) => {}
            Ok(count) => warn!(count, "re-queued stalled sync tasks"),
            Err(err) => warn!(error = %err, "stalled task reclamation failed"),
        }

        let claimed = queue.claim_due(config.concurrency).await?;

        if claimed.is_empty() {
            debug!("no due tasks to process");
            return Ok(());
        }

        info!(count = claimed.len(), "processing sync batch");

        let mut join_set = JoinSet::new();
        for claimed_task in claimed {
            let processor = Arc::clone(processor);
            join_set.spawn(async move {
                let outcome = processor.process_task(&claimed_task.task).await;
                (claimed_task, outcome)
            });
        }

        let mut bookkeeping_errors: Vec<String> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let (claimed_task, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "sync task panicked");
                    continue;
                }
            };

            let job_id = claimed_task.task.job_id.as_str();
            match outcome {
                Ok(()) => {
                    debug!(job_id, "sync task completed");
                    if let Err(err) = queue.mark_completed(job_id).await {
                        warn!(job_id, error = %err, "mark_completed failed");
                        bookkeeping_errors.push(format!("mark_completed for {job_id}: {err}"));
                    }
                }
                Err(err) => {
                    let reason = truncate_reason(&err.to_string());
                    if let Err(mark_err) =
                        Self::record_failure(queue, &claimed_task, &reason, config).await
                    {
                        warn!(job_id, error = %mark_err, "failure bookkeeping failed");
                        bookkeeping_errors.push(format!("failure bookkeeping for {job_id}: {mark_err}"));
                    }
                }
            }
        }

        if let Err(err) = queue.prune_history(config.keep_completed, config.keep_failed).await {
            warn!(error = %err, "history pruning failed");
        }

        if !bookkeeping_errors.is_empty() {
            return Err(LeadSyncError::Internal(bookkeeping_errors.join("; ")));
        }

        Ok(())
    }

    /// Schedule a retry with exponential backoff, or mark the task
    /// permanently failed once attempts are exhausted.
    async fn record_failure(
        queue: &Arc<dyn TaskQueue>,
        claimed: &ClaimedTask,
        reason: &str,
        config: &SyncWorkerConfig,
    ) -> Result<()> {
        let job_id = claimed.task.job_id.as_str();

        if claimed.attempts >= config.max_attempts {
            warn!(job_id, attempts = claimed.attempts, reason, "sync task permanently failed");
            queue.mark_failed(job_id, reason).await
        } else {
            let delay = backoff_delay(config.backoff_base, claimed.attempts);
            let next_attempt_at = Utc::now().timestamp() + delay.as_secs() as i64;
            warn!(
                job_id,
                attempts = claimed.attempts,
                delay_secs = delay.as_secs(),
                reason,
                "sync task failed, scheduling retry"
            );
            queue.mark_retry(job_id, reason, next_attempt_at).await
        }
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, shift capped to keep the
/// delay bounded.
fn backoff_delay(base: Duration, attempt: i32) -> Duration {
    let shift = attempt.saturating_sub(1).clamp(0, 8) as u32;
    base.saturating_mul(1u32 << shift)
}

fn truncate_reason(reason: &str) -> String {
    const MAX_LEN: usize = 256;
    if reason.len() <= MAX_LEN {
        return reason.to_string();
    }

    let mut truncated = reason.chars().take(MAX_LEN.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
