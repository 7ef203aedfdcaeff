//! Sync service: drives one job from `pending` to a terminal state.
//!
//! Three ordered external calls, each persisted to the job store before the
//! next begins: create billing customer, create subscription, write both ids
//! back to the CRM lead. Any step failure marks the job `failed` and returns
//! the error so the queue can retry the whole sequence.
//!
//! Job-store writes are best-effort: a status-write failure must not mask an
//! external call that already succeeded, so persistence errors are logged at
//! warn and the sequence continues.

use std::sync::Arc;

use leadsync_domain::{
    constants::{DEFAULT_BILLING_CYCLE, DEFAULT_SUBSCRIPTION_QUANTITY},
    LeadSyncError, NewCustomer, NewSubscription, Result, StatusUpdate, SyncJobStatus, SyncTask,
};
use tracing::{info, warn};

use crate::ports::{BillingApi, CrmApi, JobStore};

/// Configuration for the sync service.
#[derive(Debug, Clone)]
pub struct SyncServiceConfig {
    /// Product handle applied to every subscription.
    pub product_handle: String,
}

/// Orchestrates the three-step lead-to-billing synchronization.
pub struct SyncService {
    jobs: Arc<dyn JobStore>,
    crm: Arc<dyn CrmApi>,
    billing: Arc<dyn BillingApi>,
    config: SyncServiceConfig,
}

impl SyncService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        crm: Arc<dyn CrmApi>,
        billing: Arc<dyn BillingApi>,
        config: SyncServiceConfig,
    ) -> Self {
        Self { jobs, crm, billing, config }
    }

    /// Run the full sequence for one task.
    ///
    /// Returns the step error on failure, after persisting `failed` with the
    /// error message and whatever billing ids were already committed. There
    /// is no rollback of the billing side; a retried attempt re-runs the
    /// sequence from scratch and creates fresh billing resources.
    pub async fn process(&self, task: &SyncTask) -> Result<()> {
        let job_id = task.job_id.as_str();
        let lead_id = task.source_lead_id.as_str();

        info!(job_id, lead_id, "starting sync job");

        self.record_status(job_id, SyncJobStatus::Processing, StatusUpdate::default()).await;

        // Step 1: billing customer
        let customer_payload = NewCustomer {
            email: task.lead_data.email.clone(),
            first_name: task.lead_data.firstname.clone(),
            last_name: task.lead_data.lastname.clone(),
            company: task.lead_data.company.clone(),
            phone: task.lead_data.phone.clone(),
        };

        let customer = match self.billing.create_customer(&customer_payload).await {
            Ok(customer) => customer,
            Err(err) => return self.fail(job_id, StatusUpdate::default(), err).await,
        };

        info!(job_id, customer_id = %customer.id, "billing customer created");
        self.record_status(
            job_id,
            SyncJobStatus::MaxioCreated,
            StatusUpdate { billing_customer_id: Some(customer.id.clone()), ..Default::default() },
        )
        .await;

        // Step 2: billing subscription (held in memory until the final write)
        let subscription_payload = NewSubscription {
            customer_id: customer.id.clone(),
            product_handle: self.config.product_handle.clone(),
            billing_cycle: DEFAULT_BILLING_CYCLE.to_string(),
            quantity: DEFAULT_SUBSCRIPTION_QUANTITY,
        };

        let subscription = match self.billing.create_subscription(&subscription_payload).await {
            Ok(subscription) => subscription,
            Err(err) => return self.fail(job_id, StatusUpdate::default(), err).await,
        };

        info!(job_id, subscription_id = %subscription.id, "billing subscription created");

        // Step 3: CRM write-back
        if let Err(err) =
            self.crm.update_lead_billing_ids(lead_id, &customer.id, &subscription.id).await
        {
            let update = StatusUpdate {
                billing_subscription_id: Some(subscription.id.clone()),
                ..Default::default()
            };
            return self.fail(job_id, update, err).await;
        }

        self.record_status(
            job_id,
            SyncJobStatus::CrmUpdated,
            StatusUpdate {
                billing_customer_id: Some(customer.id.clone()),
                billing_subscription_id: Some(subscription.id.clone()),
                ..Default::default()
            },
        )
        .await;

        info!(
            job_id,
            lead_id,
            customer_id = %customer.id,
            subscription_id = %subscription.id,
            "sync job completed"
        );

        Ok(())
    }

    /// Persist `failed` with the step error, then hand the error back to the
    /// caller so the queue's retry policy can re-attempt.
    async fn fail(
        &self,
        job_id: &str,
        mut update: StatusUpdate,
        err: LeadSyncError,
    ) -> Result<()> {
        warn!(job_id, error = %err, "sync job step failed");
        update.error_message = Some(err.to_string());
        self.record_status(job_id, SyncJobStatus::Failed, update).await;
        Err(err)
    }

    /// Best-effort status write; failures are logged, never propagated.
    async fn record_status(&self, job_id: &str, status: SyncJobStatus, update: StatusUpdate) {
        if let Err(err) = self.jobs.update_status(job_id, status, update).await {
            warn!(job_id, status = %status, error = %err, "failed to update sync job status");
        }
    }
}
