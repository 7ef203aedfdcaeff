//! Port interfaces implemented by the infrastructure layer

use async_trait::async_trait;
use leadsync_domain::{
    ClaimedTask, Customer, Lead, NewCustomer, NewSubscription, OnboardingForm, Result,
    StatusUpdate, Subscription, SyncJob, SyncJobStatus, SyncTask,
};

/// Durable store of synchronization jobs. Single writer-of-record for
/// job state; the queue only holds transient task references.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job at `pending`.
    async fn insert(&self, job_id: &str, source_lead_id: &str) -> Result<()>;

    /// Apply a status transition plus any supplied fields. Only fields
    /// present in `update` are written; existing values are preserved.
    async fn update_status(
        &self,
        job_id: &str,
        status: SyncJobStatus,
        update: StatusUpdate,
    ) -> Result<()>;

    /// Fetch a job by its identifier.
    async fn get_by_job_id(&self, job_id: &str) -> Result<Option<SyncJob>>;
}

/// Durable, at-least-once task queue keyed by job id.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a task. Re-submission with the same `job_id` is a
    /// deduplicating upsert, not a duplicate task.
    async fn enqueue(&self, task: &SyncTask) -> Result<()>;

    /// Claim up to `limit` due tasks, transitioning them to running and
    /// incrementing their attempt counters.
    async fn claim_due(&self, limit: usize) -> Result<Vec<ClaimedTask>>;

    /// Record successful completion.
    async fn mark_completed(&self, job_id: &str) -> Result<()>;

    /// Schedule another attempt at `next_attempt_at` (unix seconds).
    async fn mark_retry(&self, job_id: &str, error: &str, next_attempt_at: i64) -> Result<()>;

    /// Record permanent failure after attempt exhaustion.
    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()>;

    /// Re-queue running tasks untouched since `stalled_before` (unix
    /// seconds). Recovers tasks stranded by a crash or a dropped batch;
    /// returns the number of rows re-queued.
    async fn reclaim_stale(&self, stalled_before: i64) -> Result<usize>;

    /// Cap completed/failed history to the given counts.
    async fn prune_history(&self, keep_completed: usize, keep_failed: usize) -> Result<()>;
}

/// Lead-management (CRM) API operations used by the pipeline.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Fetch a lead record.
    async fn get_lead(&self, lead_id: &str) -> Result<Lead>;

    /// Write billing identifiers back to the lead and mark its status
    /// as finance-setup complete.
    async fn update_lead_billing_ids(
        &self,
        lead_id: &str,
        customer_id: &str,
        subscription_id: &str,
    ) -> Result<Lead>;

    /// Sync onboarding form fields onto the lead's custom fields.
    async fn update_lead_form_data(&self, lead_id: &str, form: &OnboardingForm) -> Result<Lead>;

    /// Lightweight connectivity probe for health reporting.
    async fn test_connection(&self) -> bool;
}

/// Billing API operations used by the pipeline.
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer>;

    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<Subscription>;

    /// Lightweight connectivity probe for health reporting.
    async fn test_connection(&self) -> bool;
}

/// Best-effort structured application log (observability only).
#[async_trait]
pub trait ApplicationLog: Send + Sync {
    /// Record a log row. Implementations must not fail the caller;
    /// persistence errors are logged and swallowed.
    async fn record(&self, level: &str, message: &str, context: Option<serde_json::Value>);
}
