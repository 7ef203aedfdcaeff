//! HTTP client for the vTiger CRM REST API.
//!
//! vTiger authenticates with `accessKey` and `username` query parameters on
//! every request. Successful responses wrap the record in a `result` field.

use std::time::Duration;

use async_trait::async_trait;
use leadsync_core::CrmApi;
use leadsync_domain::{CrmConfig, Lead, LeadSyncError, OnboardingForm, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::http::HttpClient;

/// vTiger CRM client.
pub struct VtigerClient {
    http: HttpClient,
    base_url: String,
    username: String,
    access_key: String,
}

#[derive(Debug, Deserialize)]
struct LeadEnvelope {
    result: Lead,
}

impl VtigerClient {
    /// Build a client from configuration. Fails fast on missing credentials
    /// so misconfiguration surfaces at startup, not mid-sync.
    pub fn new(config: &CrmConfig) -> Result<Self> {
        if config.access_key.trim().is_empty() || config.username.trim().is_empty() {
            return Err(LeadSyncError::Config("vTiger credentials not configured".into()));
        }
        if config.base_url.trim().is_empty() {
            return Err(LeadSyncError::Config("vTiger base URL not configured".into()));
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("leadsync")
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            access_key: config.access_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .query(&[("accessKey", self.access_key.as_str()), ("username", self.username.as_str())]);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.http.send(request).await
    }

    async fn read_lead(&self, path: &str, response: reqwest::Response) -> Result<Lead> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(path, %status, body = %body, "vTiger request rejected");
            return Err(LeadSyncError::Upstream(format!(
                "vTiger returned {status} for {path}"
            )));
        }

        let envelope: LeadEnvelope = response
            .json()
            .await
            .map_err(|e| LeadSyncError::Upstream(format!("invalid vTiger response: {e}")))?;
        Ok(envelope.result)
    }

    async fn update_lead(&self, lead_id: &str, fields: serde_json::Value) -> Result<Lead> {
        let path = format!("/Leads/{lead_id}");
        let response = self.execute(Method::PUT, &path, Some(fields)).await?;
        self.read_lead(&path, response).await
    }
}

#[async_trait]
impl CrmApi for VtigerClient {
    async fn get_lead(&self, lead_id: &str) -> Result<Lead> {
        let path = format!("/Leads/{lead_id}");
        let response = self.execute(Method::GET, &path, None).await?;
        self.read_lead(&path, response).await
    }

    async fn update_lead_billing_ids(
        &self,
        lead_id: &str,
        customer_id: &str,
        subscription_id: &str,
    ) -> Result<Lead> {
        self.update_lead(
            lead_id,
            json!({
                "cf_maxio_customer_id": customer_id,
                "cf_maxio_subscription_id": subscription_id,
                "leadstatus": leadsync_domain::COMPLETED_LEAD_STATUS,
            }),
        )
        .await
    }

    async fn update_lead_form_data(&self, lead_id: &str, form: &OnboardingForm) -> Result<Lead> {
        self.update_lead(
            lead_id,
            json!({
                "cf_company_trading_name": form.company_trading_name,
                "cf_operating_hours": form.operating_hours,
                "cf_company_address": form.company_address,
                "cf_company_phone": form.company_phone,
                "cf_company_email": form.company_email,
                "cf_sick_leave_policy": form.sick_leave_policy,
                "cf_annual_leave_policy": form.annual_leave_policy,
                "cf_probation_period": form.probation_period,
                "cf_notice_period_employee": form.notice_period_employee,
                "cf_notice_period_employer": form.notice_period_employer,
                "cf_working_hours": form.working_hours,
                "cf_overtime_policy": form.overtime_policy,
                "cf_industry": form.industry,
                "cf_number_of_employees": form.number_of_employees,
                "cf_special_requirements": form.special_requirements,
            }),
        )
        .await
    }

    async fn test_connection(&self) -> bool {
        match self.execute(Method::GET, "/ping", None).await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "vTiger connection test failed");
                false
            }
        }
    }
}
