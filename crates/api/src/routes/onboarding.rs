//! Onboarding form intake and read-back.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use leadsync_domain::{LeadSyncError, OnboardingForm};
use serde_json::json;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::ApiError;

/// POST /onboarding/submit
///
/// Validates the required fields, then syncs the form onto the CRM lead.
/// A CRM write failure is logged but does not fail the submission; the
/// form data is accepted and the writeback retried on the next submit.
pub async fn submit(
    State(ctx): State<AppContext>,
    Json(form): Json<OnboardingForm>,
) -> Result<Response, ApiError> {
    let client_id = match form.client_id.as_deref() {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => return Err(LeadSyncError::InvalidInput("Client ID is required".into()).into()),
    };

    info!(client_id = %client_id, "received onboarding form submission");

    let missing = form.missing_fields();
    if !missing.is_empty() {
        let body = json!({
            "status": "error",
            "message": "Missing required fields",
            "missingFields": missing,
        });
        return Ok((axum::http::StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    match ctx.crm.update_lead_form_data(&client_id, &form).await {
        Ok(_) => {
            info!(client_id = %client_id, "onboarding form data saved to CRM");
        }
        Err(err) => {
            // Demo-mode tolerance: accept the form even when the CRM is down.
            warn!(client_id = %client_id, error = %err, "failed to save form data to CRM");
            ctx.logs
                .record(
                    "warn",
                    "onboarding CRM writeback failed",
                    Some(json!({ "clientId": client_id, "error": err.to_string() })),
                )
                .await;
        }
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Form data saved successfully",
        "data": {
            "clientId": client_id,
            "submittedAt": Utc::now().to_rfc3339(),
        },
    }))
    .into_response())
}

/// GET /onboarding/client/{client_id}
pub async fn client_data(
    State(ctx): State<AppContext>,
    Path(client_id): Path<String>,
) -> Result<Response, ApiError> {
    info!(client_id = %client_id, "retrieving client data");

    let lead = ctx.crm.get_lead(&client_id).await?;

    let form_data = json!({
        "companyTradingName": lead.cf_company_trading_name.unwrap_or_default(),
        "operatingHours": lead.cf_operating_hours.unwrap_or_default(),
        "companyAddress": lead.cf_company_address.unwrap_or_default(),
        "companyPhone": lead.cf_company_phone.unwrap_or_default(),
        "companyEmail": lead.cf_company_email.unwrap_or_default(),
        "sickLeavePolicy": lead.cf_sick_leave_policy.unwrap_or_default(),
        "annualLeavePolicy": lead.cf_annual_leave_policy.unwrap_or_default(),
        "probationPeriod": lead.cf_probation_period.unwrap_or_default(),
        "noticePeriodEmployee": lead.cf_notice_period_employee.unwrap_or_default(),
        "noticePeriodEmployer": lead.cf_notice_period_employer.unwrap_or_default(),
        "workingHours": lead.cf_working_hours.unwrap_or_default(),
        "overtimePolicy": lead.cf_overtime_policy.unwrap_or_default(),
        "industry": lead.cf_industry.unwrap_or_default(),
        "numberOfEmployees": lead.cf_number_of_employees.unwrap_or_default(),
        "specialRequirements": lead.cf_special_requirements.unwrap_or_default(),
    });

    Ok(Json(json!({
        "status": "success",
        "data": {
            "clientId": client_id,
            "formData": form_data,
            "lastUpdated": Utc::now().to_rfc3339(),
        },
    }))
    .into_response())
}
