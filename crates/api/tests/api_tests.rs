//! End-to-end tests for the HTTP surface, backed by a real SQLite store
//! and wiremock stand-ins for the CRM and billing APIs.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use leadsync_api::{build_router, AppContext};
use leadsync_domain::Config;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_TOKEN: &str = "test-api-token";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

struct TestHarness {
    _db_dir: TempDir,
    ctx: AppContext,
    crm: MockServer,
    billing: MockServer,
}

async fn harness() -> TestHarness {
    harness_with(|_| {}).await
}

async fn harness_with(tweak: impl FnOnce(&mut Config)) -> TestHarness {
    let crm = MockServer::start().await;
    let billing = MockServer::start().await;
    let db_dir = TempDir::new().expect("temp dir");

    let mut config = Config::default();
    config.database.path = db_dir.path().join("test.db").display().to_string();
    config.server.api_token = API_TOKEN.into();
    config.server.webhook_secret = WEBHOOK_SECRET.into();
    config.crm.base_url = crm.uri();
    config.crm.username = "sync-bot".into();
    config.crm.access_key = "crm-key".into();
    config.billing.base_url = billing.uri();
    config.billing.api_key = "billing-key".into();
    // Keep worker-driven tests fast, and status polling out of the limiter.
    config.queue.poll_interval_ms = 25;
    config.queue.backoff_base_ms = 50;
    config.server.webhook_rate_limit = 10_000;
    config.server.api_rate_limit = 10_000;
    tweak(&mut config);

    let ctx = AppContext::new(config).expect("app context");
    TestHarness { _db_dir: db_dir, ctx, crm, billing }
}

fn app(harness: &TestHarness) -> Router {
    build_router(harness.ctx.clone())
}

fn webhook_payload(record_id: &str, leadstatus: &str, iban: Option<&str>) -> Value {
    let mut data = json!({
        "leadstatus": leadstatus,
        "company": "Acme GmbH",
        "email": "finance@acme.test",
        "firstname": "Ada",
        "lastname": "Lovelace",
        "phone": "+49 30 1234567",
    });
    if let Some(iban) = iban {
        data["cf_iban"] = json!(iban);
    }
    json!({
        "event": "record.update",
        "module": "Leads",
        "record_id": record_id,
        "data": data,
    })
}

fn signed_webhook(payload: &Value) -> Request<Body> {
    Request::post("/webhooks/vtiger/lead-status-change")
        .header("content-type", "application/json")
        .header("x-vtiger-signature", WEBHOOK_SECRET)
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

async fn read_body(response: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn job_row_count(harness: &TestHarness) -> i64 {
    let db = std::sync::Arc::clone(&harness.ctx.db);
    tokio::task::spawn_blocking(move || {
        let conn = db.get_connection().unwrap();
        conn.query_row("SELECT COUNT(*) FROM sync_jobs", [], |row| row.get(0)).unwrap()
    })
    .await
    .unwrap()
}

async fn job_status(harness: &TestHarness, job_id: &str) -> (StatusCode, Value) {
    let response = app(harness)
        .oneshot(
            Request::get(format!("/webhooks/vtiger/status/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, read_body(response).await)
}

// ── Webhook intake ───────────────────────────────────────────────────

#[tokio::test]
async fn webhook_ignores_non_lead_events() {
    let harness = harness().await;

    for payload in [
        json!({ "event": "record.create", "module": "Leads", "record_id": "L1", "data": {} }),
        json!({ "event": "record.update", "module": "Contacts", "record_id": "C1", "data": {} }),
    ] {
        let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert_eq!(body["status"], "ignored");
    }
    assert_eq!(job_row_count(&harness).await, 0);
}

#[tokio::test]
async fn webhook_ignores_other_lead_statuses() {
    let harness = harness().await;
    let payload = webhook_payload("LEAD-1", "Contacted", Some("DE89370400440532013000"));

    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await["status"], "ignored");
    assert_eq!(job_row_count(&harness).await, 0);
}

#[tokio::test]
async fn webhook_rejects_missing_iban() {
    let harness = harness().await;
    let payload = webhook_payload("LEAD-1", "Ready for Finance Setup", None);

    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_body(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "IBAN field is required for finance setup");
    assert_eq!(job_row_count(&harness).await, 0);
}

#[tokio::test]
async fn webhook_creates_job_and_row_is_immediately_queryable() {
    let harness = harness().await;
    let payload = webhook_payload("LEAD-42", "Ready for Finance Setup", Some("DE89370400440532013000"));

    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["status"], "received");
    let job_id = body["jobId"].as_str().expect("job id returned").to_string();

    // Row-before-response: the returned job id must resolve right away.
    let (status, status_body) = job_status(&harness, &job_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["status"], "success");
    assert_eq!(status_body["data"]["source_lead_id"], "LEAD-42");
    assert_eq!(status_body["data"]["status"], "pending");
}

#[tokio::test]
async fn webhook_requires_valid_signature() {
    let harness = harness().await;
    let payload = webhook_payload("LEAD-1", "Ready for Finance Setup", Some("DE1"));

    let unsigned = Request::post("/webhooks/vtiger/lead-status-change")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = app(&harness).oneshot(unsigned).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let badly_signed = Request::post("/webhooks/vtiger/lead-status-change")
        .header("content-type", "application/json")
        .header("x-vtiger-signature", "wrong")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = app(&harness).oneshot(badly_signed).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn job_status_unknown_id_returns_404() {
    let harness = harness().await;
    let (status, body) = job_status(&harness, "no-such-job").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Job not found");
}

#[tokio::test]
async fn webhook_rate_limit_rejects_excess_requests() {
    let harness = harness_with(|config| {
        config.server.webhook_rate_limit = 2;
    })
    .await;
    let payload = json!({ "event": "x", "module": "y", "record_id": "z", "data": {} });

    for _ in 0..2 {
        let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
    }

    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = read_body(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["retryAfter"].as_u64().is_some());
}

// ── Worker-driven sync scenarios ─────────────────────────────────────

async fn wait_for_status(harness: &TestHarness, job_id: &str, expected: &str) -> Value {
    for _ in 0..200 {
        let (_, body) = job_status(harness, job_id).await;
        if body["data"]["status"] == expected {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} never reached status {expected}");
}

#[tokio::test]
async fn full_sync_reaches_crm_updated_with_billing_ids() {
    let harness = harness().await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "customer": {
                "id": "cust-1",
                "email": "finance@acme.test",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "company": "Acme GmbH"
            }
        })))
        .mount(&harness.billing)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_json(&json!({
            "subscription": {
                "customer_id": "cust-1",
                "product_handle": "default-hr-package",
                "billing_cycle": "monthly",
                "quantity": 1
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "subscription": {
                "id": "sub-1",
                "customer_id": "cust-1",
                "product_handle": "default-hr-package",
                "state": "active"
            }
        })))
        .mount(&harness.billing)
        .await;
    Mock::given(method("PUT"))
        .and(path("/Leads/LEAD-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "id": "LEAD-7", "leadstatus": "Finance Setup Complete" }
        })))
        .mount(&harness.crm)
        .await;

    let mut worker = harness.ctx.make_worker();
    worker.start().await.unwrap();

    let payload = webhook_payload("LEAD-7", "Ready for Finance Setup", Some("DE89370400440532013000"));
    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    let job_id = read_body(response).await["jobId"].as_str().unwrap().to_string();

    let body = wait_for_status(&harness, &job_id, "crm_updated").await;
    assert_eq!(body["data"]["billing_customer_id"], "cust-1");
    assert_eq!(body["data"]["billing_subscription_id"], "sub-1");
    assert!(body["data"]["error_message"].is_null());

    worker.stop().await.unwrap();
}

#[tokio::test]
async fn customer_failure_marks_job_failed_without_ids() {
    let harness = harness_with(|config| {
        config.queue.max_attempts = 1;
    })
    .await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("maxio down"))
        .mount(&harness.billing)
        .await;

    let mut worker = harness.ctx.make_worker();
    worker.start().await.unwrap();

    let payload = webhook_payload("LEAD-10", "Ready for Finance Setup", Some("DE89370400440532013000"));
    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    let job_id = read_body(response).await["jobId"].as_str().unwrap().to_string();

    let body = wait_for_status(&harness, &job_id, "failed").await;
    assert!(body["data"]["billing_customer_id"].is_null());
    assert!(body["data"]["billing_subscription_id"].is_null());
    assert!(body["data"]["error_message"].as_str().is_some());

    worker.stop().await.unwrap();
}

#[tokio::test]
async fn subscription_failure_keeps_customer_id_on_failed_job() {
    let harness = harness_with(|config| {
        config.queue.max_attempts = 1;
    })
    .await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "customer": {
                "id": "cust-9",
                "email": "finance@acme.test",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "company": "Acme GmbH"
            }
        })))
        .mount(&harness.billing)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid product"))
        .mount(&harness.billing)
        .await;

    let mut worker = harness.ctx.make_worker();
    worker.start().await.unwrap();

    let payload = webhook_payload("LEAD-8", "Ready for Finance Setup", Some("DE89370400440532013000"));
    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    let job_id = read_body(response).await["jobId"].as_str().unwrap().to_string();

    let body = wait_for_status(&harness, &job_id, "failed").await;
    // The committed step survives the failure.
    assert_eq!(body["data"]["billing_customer_id"], "cust-9");
    assert!(body["data"]["billing_subscription_id"].is_null());
    assert!(body["data"]["error_message"].as_str().is_some());

    worker.stop().await.unwrap();
}

#[tokio::test]
async fn retry_after_transient_failure_creates_fresh_billing_resources() {
    let harness = harness().await;

    // Customer creation always succeeds; the first subscription call fails,
    // so attempt 1 dies after a customer already exists. The retried attempt
    // re-runs the whole sequence and creates a second customer: there is no
    // idempotency key, duplicate billing resources are accepted behavior.
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "customer": {
                "id": "cust-retry",
                "email": "finance@acme.test",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "company": "Acme GmbH"
            }
        })))
        .mount(&harness.billing)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("transient"))
        .up_to_n_times(1)
        .mount(&harness.billing)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "subscription": {
                "id": "sub-retry",
                "customer_id": "cust-retry",
                "product_handle": "default-hr-package",
                "state": "active"
            }
        })))
        .mount(&harness.billing)
        .await;
    Mock::given(method("PUT"))
        .and(path("/Leads/LEAD-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "id": "LEAD-9" }
        })))
        .mount(&harness.crm)
        .await;

    let mut worker = harness.ctx.make_worker();
    worker.start().await.unwrap();

    let payload = webhook_payload("LEAD-9", "Ready for Finance Setup", Some("DE89370400440532013000"));
    let response = app(&harness).oneshot(signed_webhook(&payload)).await.unwrap();
    let job_id = read_body(response).await["jobId"].as_str().unwrap().to_string();

    let body = wait_for_status(&harness, &job_id, "crm_updated").await;
    assert_eq!(body["data"]["billing_customer_id"], "cust-retry");
    assert_eq!(body["data"]["billing_subscription_id"], "sub-retry");

    // Both attempts created a customer.
    let customer_posts = harness
        .billing
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/customers")
        .count();
    assert_eq!(customer_posts, 2);

    worker.stop().await.unwrap();
}

// ── Onboarding API ───────────────────────────────────────────────────

fn complete_form(client_id: &str) -> Value {
    json!({
        "clientId": client_id,
        "companyTradingName": "Acme Trading",
        "operatingHours": "9-5",
        "companyAddress": "1 Main St",
        "companyPhone": "+49 30 1234567",
        "companyEmail": "hr@acme.test",
        "sickLeavePolicy": "statutory",
        "annualLeavePolicy": "28 days",
        "probationPeriod": "6 months",
        "noticePeriodEmployee": "1 month",
        "noticePeriodEmployer": "2 months",
        "industry": "Software",
        "numberOfEmployees": "25",
    })
}

fn authed_submit(body: &Value, token: &str) -> Request<Body> {
    Request::post("/onboarding/submit")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn onboarding_requires_bearer_token() {
    let harness = harness().await;
    let body = complete_form("LEAD-1");

    let unauthed = Request::post("/onboarding/submit")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app(&harness).oneshot(unauthed).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(&harness).oneshot(authed_submit(&body, "wrong-token")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn onboarding_rejects_missing_client_id() {
    let harness = harness().await;
    let mut body = complete_form("LEAD-1");
    body.as_object_mut().unwrap().remove("clientId");

    let response = app(&harness).oneshot(authed_submit(&body, API_TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_body(response).await["message"], "Client ID is required");
}

#[tokio::test]
async fn onboarding_reports_missing_required_fields() {
    let harness = harness().await;
    let mut body = complete_form("LEAD-1");
    body.as_object_mut().unwrap().remove("industry");
    body["numberOfEmployees"] = json!("   ");

    let response = app(&harness).oneshot(authed_submit(&body, API_TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response_body = read_body(response).await;
    assert_eq!(response_body["message"], "Missing required fields");
    let missing: Vec<&str> = response_body["missingFields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(missing.contains(&"industry"));
    assert!(missing.contains(&"numberOfEmployees"));
}

#[tokio::test]
async fn onboarding_submit_writes_form_to_crm() {
    let harness = harness().await;

    Mock::given(method("PUT"))
        .and(path("/Leads/LEAD-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "id": "LEAD-5" }
        })))
        .expect(1)
        .mount(&harness.crm)
        .await;

    let response =
        app(&harness).oneshot(authed_submit(&complete_form("LEAD-5"), API_TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["clientId"], "LEAD-5");
}

#[tokio::test]
async fn onboarding_submit_tolerates_crm_outage() {
    let harness = harness().await;

    Mock::given(method("PUT"))
        .and(path("/Leads/LEAD-6"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.crm)
        .await;

    let response =
        app(&harness).oneshot(authed_submit(&complete_form("LEAD-6"), API_TOKEN)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await["status"], "success");
}

#[tokio::test]
async fn onboarding_client_read_back_maps_custom_fields() {
    let harness = harness().await;

    Mock::given(method("GET"))
        .and(path("/Leads/LEAD-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "id": "LEAD-3",
                "cf_company_trading_name": "Acme Trading",
                "cf_industry": "Software",
                "cf_number_of_employees": "25"
            }
        })))
        .mount(&harness.crm)
        .await;

    let request = Request::get("/onboarding/client/LEAD-3")
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_body(response).await;
    assert_eq!(body["data"]["formData"]["companyTradingName"], "Acme Trading");
    assert_eq!(body["data"]["formData"]["industry"], "Software");
    // Absent fields come back as empty strings for the form client.
    assert_eq!(body["data"]["formData"]["overtimePolicy"], "");
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn basic_health_is_always_ok() {
    let harness = harness().await;
    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "leadsync");
}

#[tokio::test]
async fn detailed_health_reports_dependency_state() {
    let harness = harness().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&harness.crm)
        .await;
    Mock::given(method("GET"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.billing)
        .await;

    let response = app(&harness)
        .oneshot(Request::get("/health/detailed").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dependencies"]["database"], "healthy");
    assert_eq!(body["dependencies"]["vtiger"], "healthy");
    assert_eq!(body["dependencies"]["maxio"], "healthy");
}

#[tokio::test]
async fn detailed_health_degrades_when_upstream_is_down() {
    let harness = harness().await;

    // CRM healthy, billing unreachable (no /customers mock → 404).
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&harness.crm)
        .await;

    let response = app(&harness)
        .oneshot(Request::get("/health/detailed").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["dependencies"]["maxio"], "unhealthy");
}
