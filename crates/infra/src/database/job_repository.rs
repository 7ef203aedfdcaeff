//! SQLite implementation of the job store port.
//!
//! The `sync_jobs` table is the writer-of-record for job state. Updates are
//! partial and additive: a `NULL` parameter leaves the stored column alone,
//! mirroring the way billing identifiers accumulate as steps succeed.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadsync_core::JobStore;
use leadsync_domain::{LeadSyncError, Result, StatusUpdate, SyncJob, SyncJobStatus};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager, PooledConnection};
use crate::errors::map_join_error;

/// SQLite-backed job repository.
pub struct SqliteJobRepository {
    db: Arc<DbManager>,
}

impl SqliteJobRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_row(conn: &PooledConnection, job_id: &str, source_lead_id: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO sync_jobs (job_id, source_lead_id, status, created_at, updated_at)
             VALUES (?1, ?2, 'pending', ?3, ?3)",
            params![job_id, source_lead_id, now],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn update_row(
        conn: &PooledConnection,
        job_id: &str,
        status: SyncJobStatus,
        update: &StatusUpdate,
    ) -> Result<()> {
        let now = Utc::now().timestamp();
        let affected = conn
            .execute(
                "UPDATE sync_jobs SET
                     status = ?2,
                     updated_at = ?3,
                     billing_customer_id = COALESCE(?4, billing_customer_id),
                     billing_subscription_id = COALESCE(?5, billing_subscription_id),
                     error_message = COALESCE(?6, error_message)
                 WHERE job_id = ?1",
                params![
                    job_id,
                    status.to_string(),
                    now,
                    update.billing_customer_id,
                    update.billing_subscription_id,
                    update.error_message,
                ],
            )
            .map_err(map_sql_error)?;

        if affected == 0 {
            return Err(LeadSyncError::NotFound(format!("sync job {job_id} not found")));
        }
        Ok(())
    }

    fn fetch_row(conn: &PooledConnection, job_id: &str) -> Result<Option<SyncJob>> {
        conn.query_row(
            "SELECT job_id, source_lead_id, status, billing_customer_id,
                    billing_subscription_id, error_message, created_at, updated_at
             FROM sync_jobs WHERE job_id = ?1",
            params![job_id],
            map_job_row,
        )
        .optional()
        .map_err(map_sql_error)
    }
}

#[async_trait]
impl JobStore for SqliteJobRepository {
    async fn insert(&self, job_id: &str, source_lead_id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();
        let source_lead_id = source_lead_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::insert_row(&conn, &job_id, &source_lead_id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: SyncJobStatus,
        update: StatusUpdate,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::update_row(&conn, &job_id, status, &update)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_by_job_id(&self, job_id: &str) -> Result<Option<SyncJob>> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();

        task::spawn_blocking(move || -> Result<Option<SyncJob>> {
            let conn = db.get_connection()?;
            Self::fetch_row(&conn, &job_id)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<SyncJob> {
    let job_id: String = row.get(0)?;
    let status_raw: String = row.get(2)?;
    let status = parse_status(&job_id, &status_raw);

    Ok(SyncJob {
        job_id,
        source_lead_id: row.get(1)?,
        status,
        billing_customer_id: row.get(3)?,
        billing_subscription_id: row.get(4)?,
        error_message: row.get(5)?,
        created_at: timestamp_to_datetime(row.get(6)?),
        updated_at: timestamp_to_datetime(row.get(7)?),
    })
}

fn parse_status(job_id: &str, raw: &str) -> SyncJobStatus {
    match SyncJobStatus::from_str(raw) {
        Ok(status) => status,
        Err(err) => {
            warn!(job_id, raw_status = raw, error = %err, "invalid job status in store");
            SyncJobStatus::Pending
        }
    }
}

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
