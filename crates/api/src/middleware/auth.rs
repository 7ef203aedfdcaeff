//! Token and webhook-signature authentication.
//!
//! The onboarding API uses a static bearer token; the webhook endpoint
//! compares a shared secret carried in the `x-vtiger-signature` header.
//! Both reject with 401; an unconfigured secret is a server error, never
//! an open door.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use leadsync_domain::LeadSyncError;
use tracing::warn;

use crate::context::AppContext;
use crate::error::ApiError;

const WEBHOOK_SIGNATURE_HEADER: &str = "x-vtiger-signature";

/// Require a valid bearer token on onboarding API routes.
pub async fn require_api_token(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = ctx.config.server.api_token.as_str();
    if expected.is_empty() {
        warn!("api token not configured");
        return Err(LeadSyncError::Config("Server configuration error".into()).into());
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let token = match header.strip_prefix("Bearer ") {
        Some(token) => token,
        None => {
            warn!(uri = %request.uri(), "missing or invalid authorization header");
            return Err(LeadSyncError::Auth("Missing or invalid authorization token".into()).into());
        }
    };

    if token != expected {
        warn!(uri = %request.uri(), "invalid api token");
        return Err(LeadSyncError::Auth("Invalid authorization token".into()).into());
    }

    Ok(next.run(request).await)
}

/// Require the shared-secret signature header on webhook routes.
pub async fn verify_webhook_signature(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let secret = ctx.config.server.webhook_secret.as_str();
    if secret.is_empty() {
        warn!("webhook secret not configured");
        return Err(LeadSyncError::Config("Server configuration error".into()).into());
    }

    let signature = request
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match signature {
        None => {
            warn!(uri = %request.uri(), "missing webhook signature");
            Err(LeadSyncError::Auth("Missing webhook signature".into()).into())
        }
        Some(signature) if signature != secret => {
            warn!(uri = %request.uri(), "invalid webhook signature");
            Err(LeadSyncError::Auth("Invalid webhook signature".into()).into())
        }
        Some(_) => Ok(next.run(request).await),
    }
}
