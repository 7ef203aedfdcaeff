//! SQLite implementation of the durable task queue port.
//!
//! Tasks are keyed by job id, so enqueue is a deduplicating upsert. The
//! payload is stored as JSON and validated back into the typed [`SyncTask`]
//! when a task is claimed; rows that fail validation are marked failed at
//! the boundary instead of reaching the worker.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use leadsync_core::TaskQueue;
use leadsync_domain::{ClaimedTask, Result, SyncTask, TaskState};
use rusqlite::params;
use tokio::task;
use tracing::warn;

use super::manager::{map_sql_error, DbManager, PooledConnection};
use crate::errors::map_join_error;

/// SQLite-backed task queue.
pub struct SqliteTaskQueue {
    db: Arc<DbManager>,
}

impl SqliteTaskQueue {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn upsert_task(conn: &PooledConnection, task: &SyncTask) -> Result<()> {
        let payload = serde_json::to_string(task)
            .map_err(|e| leadsync_domain::LeadSyncError::Internal(e.to_string()))?;
        let now = Utc::now().timestamp();

        // INSERT OR REPLACE resets attempts/backoff for a re-submitted job id.
        conn.execute(
            "INSERT OR REPLACE INTO sync_tasks
                 (job_id, payload_json, status, attempts, next_attempt_at, last_error,
                  created_at, updated_at, completed_at)
             VALUES (?1, ?2, 'queued', 0, 0, NULL, ?3, ?3, NULL)",
            params![task.job_id, payload, now],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn claim_rows(conn: &mut PooledConnection, limit: usize) -> Result<Vec<ClaimedTask>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let now = Utc::now().timestamp();
        let tx = conn.transaction().map_err(map_sql_error)?;

        let rows: Vec<(String, String, i32)> = {
            let mut stmt = tx
                .prepare(
                    "SELECT job_id, payload_json, attempts FROM sync_tasks
                     WHERE status = 'queued' AND next_attempt_at <= ?1
                     ORDER BY created_at ASC
                     LIMIT ?2",
                )
                .map_err(map_sql_error)?;

            let mapped = stmt
                .query_map(params![now, limit as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(map_sql_error)?;

            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row.map_err(map_sql_error)?);
            }
            rows
        };

        let mut claimed = Vec::with_capacity(rows.len());
        for (job_id, payload_json, attempts) in rows {
            let attempts = attempts + 1;
            match serde_json::from_str::<SyncTask>(&payload_json) {
                Ok(task) => {
                    tx.execute(
                        "UPDATE sync_tasks
                         SET status = 'running', attempts = ?2, updated_at = ?3
                         WHERE job_id = ?1",
                        params![job_id, attempts, now],
                    )
                    .map_err(map_sql_error)?;
                    claimed.push(ClaimedTask { task, attempts });
                }
                Err(err) => {
                    // Malformed payload never reaches the worker.
                    warn!(job_id = %job_id, error = %err, "invalid task payload, marking failed");
                    tx.execute(
                        "UPDATE sync_tasks
                         SET status = 'failed', attempts = ?2, last_error = ?3,
                             updated_at = ?4, completed_at = ?4
                         WHERE job_id = ?1",
                        params![job_id, attempts, err.to_string(), now],
                    )
                    .map_err(map_sql_error)?;
                }
            }
        }

        tx.commit().map_err(map_sql_error)?;
        Ok(claimed)
    }

    fn set_state(
        conn: &PooledConnection,
        job_id: &str,
        state: TaskState,
        error: Option<&str>,
        next_attempt_at: Option<i64>,
        terminal: bool,
    ) -> Result<()> {
        let now = Utc::now().timestamp();
        let completed_at = terminal.then_some(now);
        conn.execute(
            "UPDATE sync_tasks
             SET status = ?2,
                 last_error = COALESCE(?3, last_error),
                 next_attempt_at = COALESCE(?4, next_attempt_at),
                 updated_at = ?5,
                 completed_at = COALESCE(?6, completed_at)
             WHERE job_id = ?1",
            params![job_id, state.to_string(), error, next_attempt_at, now, completed_at],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    fn reclaim(conn: &PooledConnection, stalled_before: i64) -> Result<usize> {
        let now = Utc::now().timestamp();
        let affected = conn
            .execute(
                "UPDATE sync_tasks
                 SET status = 'queued', updated_at = ?2
                 WHERE status = 'running' AND updated_at <= ?1",
                params![stalled_before, now],
            )
            .map_err(map_sql_error)?;
        Ok(affected)
    }

    fn prune(conn: &PooledConnection, state: TaskState, keep: usize) -> Result<()> {
        conn.execute(
            "DELETE FROM sync_tasks
             WHERE status = ?1 AND job_id NOT IN (
                 SELECT job_id FROM sync_tasks
                 WHERE status = ?1
                 ORDER BY updated_at DESC, job_id DESC
                 LIMIT ?2
             )",
            params![state.to_string(), keep as i64],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, task: &SyncTask) -> Result<()> {
        let db = Arc::clone(&self.db);
        let task = task.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::upsert_task(&conn, &task)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn claim_due(&self, limit: usize) -> Result<Vec<ClaimedTask>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<ClaimedTask>> {
            let mut conn = db.get_connection()?;
            Self::claim_rows(&mut conn, limit)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_completed(&self, job_id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::set_state(&conn, &job_id, TaskState::Completed, None, None, true)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_retry(&self, job_id: &str, error: &str, next_attempt_at: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();
        let error = error.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::set_state(
                &conn,
                &job_id,
                TaskState::Queued,
                Some(&error),
                Some(next_attempt_at),
                false,
            )
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job_id = job_id.to_string();
        let error = error.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::set_state(&conn, &job_id, TaskState::Failed, Some(&error), None, true)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn reclaim_stale(&self, stalled_before: i64) -> Result<usize> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            Self::reclaim(&conn, stalled_before)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn prune_history(&self, keep_completed: usize, keep_failed: usize) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            Self::prune(&conn, TaskState::Completed, keep_completed)?;
            Self::prune(&conn, TaskState::Failed, keep_failed)
        })
        .await
        .map_err(map_join_error)?
    }
}
