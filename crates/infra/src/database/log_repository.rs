//! SQLite-backed application log.
//!
//! Writes are best-effort: a failure to persist a log entry is itself
//! logged via tracing and otherwise swallowed, so observability never
//! interferes with the sync pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use leadsync_core::ApplicationLog;
use leadsync_domain::Result;
use rusqlite::params;
use tokio::task;
use tracing::warn;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};

/// Application log persisted to the `application_logs` table.
pub struct SqliteApplicationLog {
    db: Arc<DbManager>,
}

impl SqliteApplicationLog {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_entry(
        db: &DbManager,
        level: &str,
        message: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<()> {
        let conn = db.get_connection()?;
        let context_json = context.map(serde_json::Value::to_string);
        conn.execute(
            "INSERT INTO application_logs (log_id, timestamp, level, message, context)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                Utc::now().timestamp(),
                level,
                message,
                context_json,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl ApplicationLog for SqliteApplicationLog {
    async fn record(&self, level: &str, message: &str, context: Option<serde_json::Value>) {
        let db = Arc::clone(&self.db);
        let level = level.to_string();
        let message = message.to_string();

        let outcome = task::spawn_blocking(move || {
            Self::insert_entry(&db, &level, &message, context.as_ref())
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to persist application log entry"),
            Err(err) => warn!(error = %err, "application log task panicked"),
        }
    }
}
