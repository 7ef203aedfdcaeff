//! Service health reporting.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::context::AppContext;

const SERVICE_NAME: &str = "leadsync";

/// GET /health
pub async fn basic() -> Response {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// GET /health/detailed
///
/// Probes the database and both upstream APIs. Any unhealthy dependency
/// degrades the overall status and the endpoint answers 503.
pub async fn detailed(State(ctx): State<AppContext>) -> Response {
    let db = database_health(&ctx).await;
    let crm = ctx.crm.test_connection().await;
    let billing = ctx.billing.test_connection().await;

    let degraded = !(db && crm && billing);
    let status = if degraded { "degraded" } else { "ok" };
    let code = if degraded { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::OK };

    let body = json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "database": label(db),
            "vtiger": label(crm),
            "maxio": label(billing),
        },
    });

    (code, Json(body)).into_response()
}

async fn database_health(ctx: &AppContext) -> bool {
    let db = std::sync::Arc::clone(&ctx.db);
    match tokio::task::spawn_blocking(move || db.health_check()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!(error = %err, "database health check failed");
            false
        }
        Err(err) => {
            error!(error = %err, "database health check task panicked");
            false
        }
    }
}

fn label(healthy: bool) -> &'static str {
    if healthy {
        "healthy"
    } else {
        "unhealthy"
    }
}
