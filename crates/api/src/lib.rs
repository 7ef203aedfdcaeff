//! # Leadsync API
//!
//! HTTP surface of the lead-to-billing synchronization service:
//! - CRM webhook intake and job status lookup
//! - Onboarding form submission and read-back
//! - Health endpoints
//!
//! Webhook routes are guarded by a shared-secret signature and a strict
//! rate limit; onboarding routes by a bearer token and a wider limit.

pub mod context;
pub mod error;
pub mod middleware;
pub mod routes;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

pub use context::AppContext;
pub use error::ApiError;

/// Assemble the full application router.
pub fn build_router(ctx: AppContext) -> Router {
    let webhook_routes = Router::new()
        .route("/vtiger/lead-status-change", post(routes::webhooks::lead_status_change))
        .layer(from_fn_with_state(ctx.clone(), middleware::auth::verify_webhook_signature))
        .route("/vtiger/status/{job_id}", get(routes::webhooks::job_status))
        .layer(from_fn_with_state(ctx.clone(), middleware::rate_limit::webhook_rate_limit));

    let onboarding_routes = Router::new()
        .route("/submit", post(routes::onboarding::submit))
        .route("/client/{client_id}", get(routes::onboarding::client_data))
        .layer(from_fn_with_state(ctx.clone(), middleware::auth::require_api_token))
        .layer(from_fn_with_state(ctx.clone(), middleware::rate_limit::api_rate_limit));

    Router::new()
        .route("/health", get(routes::health::basic))
        .route("/health/detailed", get(routes::health::detailed))
        .nest("/webhooks", webhook_routes)
        .nest("/onboarding", onboarding_routes)
        .with_state(ctx)
}
