//! Common data types used throughout the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one webhook-triggered synchronization attempt.
///
/// The success path moves strictly forward
/// (`pending → processing → maxio_created → crm_updated`); `failed` is
/// reachable from any non-terminal state. A queue-level retry re-runs the
/// whole sequence and re-marks `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    Pending,
    Processing,
    MaxioCreated,
    CrmUpdated,
    Failed,
}

crate::impl_domain_status_conversions!(SyncJobStatus {
    Pending => "pending",
    Processing => "processing",
    MaxioCreated => "maxio_created",
    CrmUpdated => "crm_updated",
    Failed => "failed",
});

/// Durable record of one synchronization attempt (`sync_jobs` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub job_id: String,
    pub source_lead_id: String,
    pub status: SyncJobStatus,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial, additive update applied together with a status transition.
///
/// Only supplied fields are written; `None` leaves the stored value intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
    pub error_message: Option<String>,
}

/// Lead fields carried by the CRM change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadData {
    pub leadstatus: String,
    #[serde(default)]
    pub cf_iban: Option<String>,
    pub company: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Inbound CRM change-notification payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub module: String,
    pub record_id: String,
    pub data: LeadData,
}

/// Typed task payload held by the durable queue.
///
/// The queue stores this as JSON and validates it back into the typed form
/// at the claim boundary; the job store remains the writer-of-record for
/// job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    pub job_id: String,
    pub source_lead_id: String,
    pub lead_data: LeadData,
}

/// Queue-side state of a task (`sync_tasks` row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
}

crate::impl_domain_status_conversions!(TaskState {
    Queued => "queued",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
});

/// A task handed to the worker, with retry bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedTask {
    pub task: SyncTask,
    /// Attempts made so far, including the one just claimed.
    pub attempts: i32,
}

/// Payload for creating a billing customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Billing customer as returned by the billing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Payload for creating a billing subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub customer_id: String,
    pub product_handle: String,
    pub billing_cycle: String,
    pub quantity: u32,
}

/// Billing subscription as returned by the billing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub product_handle: String,
    pub state: String,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

/// CRM lead record, including the custom fields this service reads/writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub leadstatus: Option<String>,
    #[serde(default)]
    pub cf_iban: Option<String>,
    #[serde(default)]
    pub cf_maxio_customer_id: Option<String>,
    #[serde(default)]
    pub cf_maxio_subscription_id: Option<String>,
    #[serde(default)]
    pub cf_company_trading_name: Option<String>,
    #[serde(default)]
    pub cf_operating_hours: Option<String>,
    #[serde(default)]
    pub cf_company_address: Option<String>,
    #[serde(default)]
    pub cf_company_phone: Option<String>,
    #[serde(default)]
    pub cf_company_email: Option<String>,
    #[serde(default)]
    pub cf_sick_leave_policy: Option<String>,
    #[serde(default)]
    pub cf_annual_leave_policy: Option<String>,
    #[serde(default)]
    pub cf_probation_period: Option<String>,
    #[serde(default)]
    pub cf_notice_period_employee: Option<String>,
    #[serde(default)]
    pub cf_notice_period_employer: Option<String>,
    #[serde(default)]
    pub cf_working_hours: Option<String>,
    #[serde(default)]
    pub cf_overtime_policy: Option<String>,
    #[serde(default)]
    pub cf_industry: Option<String>,
    #[serde(default)]
    pub cf_number_of_employees: Option<String>,
    #[serde(default)]
    pub cf_special_requirements: Option<String>,
}

/// Onboarding form submission, as posted by the form frontend.
///
/// Field names stay camelCase on the wire to match the form client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingForm {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub company_trading_name: Option<String>,
    #[serde(default)]
    pub operating_hours: Option<String>,
    #[serde(default)]
    pub company_address: Option<String>,
    #[serde(default)]
    pub company_phone: Option<String>,
    #[serde(default)]
    pub company_email: Option<String>,
    #[serde(default)]
    pub sick_leave_policy: Option<String>,
    #[serde(default)]
    pub annual_leave_policy: Option<String>,
    #[serde(default)]
    pub probation_period: Option<String>,
    #[serde(default)]
    pub notice_period_employee: Option<String>,
    #[serde(default)]
    pub notice_period_employer: Option<String>,
    #[serde(default)]
    pub working_hours: Option<String>,
    #[serde(default)]
    pub overtime_policy: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub number_of_employees: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

impl OnboardingForm {
    /// Required-field list enforced at intake (working hours, overtime policy
    /// and special requirements are optional).
    pub const REQUIRED_FIELDS: [&'static str; 12] = [
        "companyTradingName",
        "operatingHours",
        "companyAddress",
        "companyPhone",
        "companyEmail",
        "sickLeavePolicy",
        "annualLeavePolicy",
        "probationPeriod",
        "noticePeriodEmployee",
        "noticePeriodEmployer",
        "industry",
        "numberOfEmployees",
    ];

    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |v| v.trim().is_empty())
        }

        let checks: [(&'static str, &Option<String>); 12] = [
            ("companyTradingName", &self.company_trading_name),
            ("operatingHours", &self.operating_hours),
            ("companyAddress", &self.company_address),
            ("companyPhone", &self.company_phone),
            ("companyEmail", &self.company_email),
            ("sickLeavePolicy", &self.sick_leave_policy),
            ("annualLeavePolicy", &self.annual_leave_policy),
            ("probationPeriod", &self.probation_period),
            ("noticePeriodEmployee", &self.notice_period_employee),
            ("noticePeriodEmployer", &self.notice_period_employer),
            ("industry", &self.industry),
            ("numberOfEmployees", &self.number_of_employees),
        ];

        checks.iter().filter(|(_, value)| blank(value)).map(|(name, _)| *name).collect()
    }
}
