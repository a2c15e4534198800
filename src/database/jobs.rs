use crate::database::connection::Database;
use crate::database::models::{AnalysisJob, JobStatus, TaskType};
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

fn row_to_job(row: &Row) -> rusqlite::Result<AnalysisJob> {
    let task_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    let payload: Option<String> = row.get(5)?;
    Ok(AnalysisJob {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        task_type: TaskType::parse(&task_type).unwrap_or(TaskType::FullScan),
        status: match status.as_str() {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        },
        attempts: row.get(4)?,
        payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        created_at_ms: row.get(6)?,
        processed_at_ms: row.get(7)?,
    })
}

const JOB_COLUMNS: &str =
    "id, wallet_id, task_type, status, attempts, payload, created_at_ms, processed_at_ms";

impl Database {
    /// Enqueue an analysis job. Skips insertion when an identical pending
    /// job for the same wallet already exists, so repeated scan requests do
    /// not pile up duplicate work.
    pub fn enqueue_job(
        &self,
        wallet_id: i64,
        task_type: TaskType,
        payload: Option<&serde_json::Value>,
    ) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM analysis_jobs
                 WHERE wallet_id = ?1 AND task_type = ?2 AND status = 'pending'",
                params![wallet_id, task_type.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(None);
        }

        conn.execute(
            "INSERT INTO analysis_jobs (wallet_id, task_type, status, payload, created_at_ms)
             VALUES (?1, ?2, 'pending', ?3, ?4)",
            params![
                wallet_id,
                task_type.as_str(),
                payload.map(|p| p.to_string()),
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(Some(conn.last_insert_rowid()))
    }

    /// Atomically claim the oldest pending job of a type.
    ///
    /// The claim is a single UPDATE so that no two workers can ever hold
    /// the same job: SELECT-then-UPDATE would race.
    pub fn claim_next_job(&self, task_type: TaskType) -> Result<Option<AnalysisJob>> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row(
                &format!(
                    "UPDATE analysis_jobs
                     SET status = 'processing', processed_at_ms = ?1
                     WHERE id = (
                         SELECT id FROM analysis_jobs
                         WHERE task_type = ?2 AND status = 'pending'
                         ORDER BY created_at_ms ASC, id ASC
                         LIMIT 1
                     )
                     RETURNING {}",
                    JOB_COLUMNS
                ),
                params![Utc::now().timestamp_millis(), task_type.as_str()],
                row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    /// Terminal success
    pub fn complete_job(&self, job_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE analysis_jobs SET status = 'completed' WHERE id = ?1",
            params![job_id],
        )?;
        Ok(())
    }

    /// Terminal failure; attempts are bumped for operator visibility but
    /// the job is never retried automatically
    pub fn fail_job(&self, job_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE analysis_jobs SET status = 'failed', attempts = attempts + 1 WHERE id = ?1",
            params![job_id],
        )?;
        Ok(())
    }

    /// Return stale `processing` jobs (claim older than the lease) to
    /// `pending` so a crashed worker's claims are eventually rescued
    pub fn reap_stale_jobs(&self, lease_ms: i64) -> Result<u64> {
        let cutoff = Utc::now().timestamp_millis() - lease_ms;
        let conn = self.conn.lock().unwrap();
        let rescued = conn.execute(
            "UPDATE analysis_jobs
             SET status = 'pending', processed_at_ms = NULL
             WHERE status = 'processing' AND processed_at_ms < ?1",
            params![cutoff],
        )?;
        Ok(rescued as u64)
    }

    /// Job counts by (task_type, status) for the operator endpoint
    pub fn job_counts(&self) -> Result<HashMap<String, HashMap<String, u64>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT task_type, status, COUNT(*) FROM analysis_jobs GROUP BY task_type, status",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut counts: HashMap<String, HashMap<String, u64>> = HashMap::new();
        for row in rows {
            let (task_type, status, count) = row?;
            counts
                .entry(task_type)
                .or_default()
                .insert(status, count.max(0) as u64);
        }
        Ok(counts)
    }

    /// True when a wallet already has this task pending or processing
    pub fn has_active_job(&self, wallet_id: i64, task_type: TaskType) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM analysis_jobs
             WHERE wallet_id = ?1 AND task_type = ?2 AND status IN ('pending', 'processing')",
            params![wallet_id, task_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_claim_is_fifo_and_exclusive() {
        let db = test_db();
        let first = db.enqueue_job(1, TaskType::FullScan, None).unwrap();
        assert!(first.is_some());
        // Same wallet, different task: separate queue entry
        db.enqueue_job(2, TaskType::FullScan, None).unwrap();

        let a = db.claim_next_job(TaskType::FullScan).unwrap().unwrap();
        let b = db.claim_next_job(TaskType::FullScan).unwrap().unwrap();
        assert_eq!(a.wallet_id, 1);
        assert_eq!(b.wallet_id, 2);
        assert_eq!(a.status, JobStatus::Processing);

        // Queue drained
        assert!(db.claim_next_job(TaskType::FullScan).unwrap().is_none());
    }

    #[test]
    fn test_enqueue_suppresses_pending_duplicates() {
        let db = test_db();
        assert!(db
            .enqueue_job(1, TaskType::FetchTransactions, None)
            .unwrap()
            .is_some());
        assert!(db
            .enqueue_job(1, TaskType::FetchTransactions, None)
            .unwrap()
            .is_none());

        // Once claimed, a new job may be enqueued again
        db.claim_next_job(TaskType::FetchTransactions)
            .unwrap()
            .unwrap();
        assert!(db
            .enqueue_job(1, TaskType::FetchTransactions, None)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_failed_jobs_are_terminal() {
        let db = test_db();
        db.enqueue_job(1, TaskType::AnalyzeApprovals, None).unwrap();
        let job = db
            .claim_next_job(TaskType::AnalyzeApprovals)
            .unwrap()
            .unwrap();
        db.fail_job(job.id).unwrap();

        // No automatic retry: the queue stays empty
        assert!(db
            .claim_next_job(TaskType::AnalyzeApprovals)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reap_returns_stale_claims() {
        let db = test_db();
        db.enqueue_job(1, TaskType::FullScan, None).unwrap();
        db.claim_next_job(TaskType::FullScan).unwrap().unwrap();

        // Fresh claim is within the lease, nothing to reap
        assert_eq!(db.reap_stale_jobs(60_000).unwrap(), 0);
        // Zero lease expires everything immediately
        assert_eq!(db.reap_stale_jobs(-1).unwrap(), 1);
        assert!(db.claim_next_job(TaskType::FullScan).unwrap().is_some());
    }
}
