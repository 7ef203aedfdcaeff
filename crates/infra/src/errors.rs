//! Conversions from external infrastructure errors into domain errors.

use leadsync_domain::LeadSyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub LeadSyncError);

impl From<InfraError> for LeadSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<LeadSyncError> for InfraError {
    fn from(value: LeadSyncError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → LeadSyncError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let domain = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => LeadSyncError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        LeadSyncError::Database("database is locked".into())
                    }
                    ErrorCode::ConstraintViolation => {
                        LeadSyncError::Database(format!("constraint violation: {message}"))
                    }
                    _ => LeadSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => LeadSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                LeadSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                LeadSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidQuery => LeadSyncError::Database("invalid SQL query".into()),
            other => LeadSyncError::Database(other.to_string()),
        };

        InfraError(domain)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → LeadSyncError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let domain = if value.is_timeout() {
            LeadSyncError::Network(format!("http request timed out: {value}"))
        } else if value.is_connect() {
            LeadSyncError::Network(format!("http connection failed: {value}"))
        } else if value.is_decode() {
            LeadSyncError::Upstream(format!("failed to decode upstream response: {value}"))
        } else {
            LeadSyncError::Network(format!("http error: {value}"))
        };

        InfraError(domain)
    }
}

/* -------------------------------------------------------------------------- */
/* tokio JoinError → LeadSyncError */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(LeadSyncError::Internal(format!("blocking task panicked: {value}")))
    }
}

/// Map a join error from `spawn_blocking` into the domain error.
pub(crate) fn map_join_error(err: tokio::task::JoinError) -> LeadSyncError {
    InfraError::from(err).into()
}
