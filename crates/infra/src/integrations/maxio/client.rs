//! HTTP client for the Maxio billing API.
//!
//! Maxio authenticates with a bearer token and wraps request and response
//! bodies in a resource envelope (`{"customer": ...}`, `{"subscription": ...}`).

use std::time::Duration;

use async_trait::async_trait;
use leadsync_core::BillingApi;
use leadsync_domain::{
    BillingConfig, Customer, LeadSyncError, NewCustomer, NewSubscription, Result, Subscription,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::http::HttpClient;

/// Maxio billing client.
pub struct MaxioClient {
    http: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    customer: Customer,
}

#[derive(Debug, Deserialize)]
struct SubscriptionEnvelope {
    subscription: Subscription,
}

impl MaxioClient {
    /// Build a client from configuration. Fails fast on a missing API key.
    pub fn new(config: &BillingConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LeadSyncError::Config("Maxio API key not configured".into()));
        }
        if config.base_url.trim().is_empty() {
            return Err(LeadSyncError::Config("Maxio base URL not configured".into()));
        }

        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", config.api_key);
        let mut auth_value = HeaderValue::from_str(&bearer)
            .map_err(|_| LeadSyncError::Config("Maxio API key contains invalid characters".into()))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("leadsync")
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let request = self.http.request(Method::POST, self.endpoint(path)).json(&body);
        self.http.send(request).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(path, %status, body = %body, "Maxio request rejected");
            return Err(LeadSyncError::Upstream(format!("Maxio returned {status} for {path}")));
        }

        response
            .json()
            .await
            .map_err(|e| LeadSyncError::Upstream(format!("invalid Maxio response: {e}")))
    }

    /// Fetch a customer by id.
    pub async fn get_customer(&self, customer_id: &str) -> Result<Customer> {
        let path = format!("/customers/{customer_id}");
        let request = self.http.request(Method::GET, self.endpoint(&path));
        let response = self.http.send(request).await?;
        let envelope: CustomerEnvelope = self.read_json(&path, response).await?;
        Ok(envelope.customer)
    }

    /// Fetch a subscription by id.
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        let path = format!("/subscriptions/{subscription_id}");
        let request = self.http.request(Method::GET, self.endpoint(&path));
        let response = self.http.send(request).await?;
        let envelope: SubscriptionEnvelope = self.read_json(&path, response).await?;
        Ok(envelope.subscription)
    }
}

#[async_trait]
impl BillingApi for MaxioClient {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let response = self.post_json("/customers", json!({ "customer": customer })).await?;
        let envelope: CustomerEnvelope = self.read_json("/customers", response).await?;
        Ok(envelope.customer)
    }

    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<Subscription> {
        let response =
            self.post_json("/subscriptions", json!({ "subscription": subscription })).await?;
        let envelope: SubscriptionEnvelope = self.read_json("/subscriptions", response).await?;
        Ok(envelope.subscription)
    }

    async fn test_connection(&self) -> bool {
        let request = self
            .http
            .request(Method::GET, self.endpoint("/customers"))
            .query(&[("per_page", "1")]);
        match self.http.send(request).await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "Maxio connection test failed");
                false
            }
        }
    }
}
