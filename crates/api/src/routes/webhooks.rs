//! CRM webhook intake.
//!
//! The webhook fires on every lead update; only `record.update` events on
//! the `Leads` module with status "Ready for Finance Setup" start a sync.
//! The job row is inserted before the task is enqueued, so a job id returned
//! to the caller is always queryable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use leadsync_domain::{
    LeadData, LeadSyncError, SyncTask, TRIGGER_LEAD_STATUS, WEBHOOK_EVENT_RECORD_UPDATE,
    WEBHOOK_MODULE_LEADS,
};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;

/// POST /webhooks/vtiger/lead-status-change
pub async fn lead_status_change(
    State(ctx): State<AppContext>,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let event = payload["event"].as_str().unwrap_or_default();
    let module = payload["module"].as_str().unwrap_or_default();
    let record_id = payload["record_id"].as_str().unwrap_or_default();
    let leadstatus = payload["data"]["leadstatus"].as_str().unwrap_or_default();

    info!(event, module, record_id, leadstatus, "received vtiger webhook");

    if event != WEBHOOK_EVENT_RECORD_UPDATE || module != WEBHOOK_MODULE_LEADS {
        info!(event, module, "ignoring non-relevant webhook event");
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response());
    }

    if leadstatus != TRIGGER_LEAD_STATUS {
        info!(leadstatus, "ignoring webhook, lead status not ready for finance setup");
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))).into_response());
    }

    let iban = payload["data"]["cf_iban"].as_str().unwrap_or_default();
    if iban.trim().is_empty() {
        warn!(record_id, "webhook missing IBAN field");
        return Err(LeadSyncError::InvalidInput(
            "IBAN field is required for finance setup".into(),
        )
        .into());
    }

    if record_id.is_empty() {
        return Err(LeadSyncError::InvalidInput("record_id is required".into()).into());
    }

    let lead_data: LeadData = serde_json::from_value(payload["data"].clone())
        .map_err(|e| LeadSyncError::InvalidInput(format!("invalid lead data: {e}")))?;

    let job_id = Uuid::new_v4().to_string();

    // Durable row first; the enqueue references an existing job.
    ctx.jobs.insert(&job_id, record_id).await?;
    ctx.queue
        .enqueue(&SyncTask {
            job_id: job_id.clone(),
            source_lead_id: record_id.to_string(),
            lead_data,
        })
        .await?;

    info!(job_id = %job_id, record_id, "sync job created and queued");
    ctx.logs
        .record(
            "info",
            "sync job created and queued",
            Some(json!({ "jobId": job_id, "leadId": record_id })),
        )
        .await;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "received",
            "jobId": job_id,
            "message": "Sync job created and queued successfully",
        })),
    )
        .into_response())
}

/// GET /webhooks/vtiger/status/{job_id}
pub async fn job_status(
    State(ctx): State<AppContext>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = ctx
        .jobs
        .get_by_job_id(&job_id)
        .await?
        .ok_or_else(|| LeadSyncError::NotFound("Job not found".into()))?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "job_id": job.job_id,
            "source_lead_id": job.source_lead_id,
            "status": job.status,
            "billing_customer_id": job.billing_customer_id,
            "billing_subscription_id": job.billing_subscription_id,
            "error_message": job.error_message,
            "created_at": job.created_at,
            "updated_at": job.updated_at,
        },
    }))
    .into_response())
}
