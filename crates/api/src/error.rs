use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use leadsync_domain::LeadSyncError;

/// Wrapper mapping domain errors onto HTTP responses.
pub struct ApiError(pub LeadSyncError);

impl From<LeadSyncError> for ApiError {
    fn from(err: LeadSyncError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            LeadSyncError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            LeadSyncError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LeadSyncError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            LeadSyncError::Network(msg) | LeadSyncError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = serde_json::json!({ "status": "error", "message": message });
        (status, Json(body)).into_response()
    }
}
