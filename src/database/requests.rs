use crate::database::connection::Database;
use crate::database::models::{ApiRequestRecord, QueueStats, RequestStatus};
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

fn row_to_request(row: &Row) -> rusqlite::Result<ApiRequestRecord> {
    let status: String = row.get(3)?;
    let request_data: String = row.get(2)?;
    Ok(ApiRequestRecord {
        id: row.get(0)?,
        provider: row.get(1)?,
        request_data: serde_json::from_str(&request_data).unwrap_or(serde_json::Value::Null),
        status: match status.as_str() {
            "processing" => RequestStatus::Processing,
            "completed" => RequestStatus::Completed,
            "failed" => RequestStatus::Failed,
            _ => RequestStatus::Pending,
        },
        attempts: row.get(4)?,
        processing_id: row.get(5)?,
        retry_at_ms: row.get(6)?,
        result: row.get(7)?,
        error: row.get(8)?,
        created_at_ms: row.get(9)?,
        completed_at_ms: row.get(10)?,
    })
}

const REQUEST_COLUMNS: &str = "id, provider, request_data, status, attempts, processing_id, \
                               retry_at_ms, result, error, created_at_ms, completed_at_ms";

impl Database {
    /// Insert a new pending request; returns its id
    pub fn insert_api_request(
        &self,
        provider: &str,
        request_data: &serde_json::Value,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO api_requests (provider, request_data, status, created_at_ms)
             VALUES (?1, ?2, 'pending', ?3)",
            params![
                provider,
                request_data.to_string(),
                Utc::now().timestamp_millis()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Atomically claim the oldest dispatchable pending request for a
    /// provider, stamping the claimer's processing id and bumping attempts.
    ///
    /// Single UPDATE so concurrent gateway instances can never double-claim.
    pub fn claim_next_api_request(
        &self,
        provider: &str,
        processing_id: &str,
    ) -> Result<Option<ApiRequestRecord>> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                &format!(
                    "UPDATE api_requests
                     SET status = 'processing', processing_id = ?1, claimed_at_ms = ?3,
                         attempts = attempts + 1
                     WHERE id = (
                         SELECT id FROM api_requests
                         WHERE provider = ?2 AND status = 'pending'
                           AND (retry_at_ms IS NULL OR retry_at_ms <= ?3)
                         ORDER BY created_at_ms ASC, id ASC
                         LIMIT 1
                     )
                     RETURNING {}",
                    REQUEST_COLUMNS
                ),
                params![processing_id, provider, now],
                row_to_request,
            )
            .optional()?;
        Ok(record)
    }

    /// Terminal transition: success
    pub fn complete_api_request(&self, request_id: i64, result: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE api_requests
             SET status = 'completed', result = ?1, error = NULL, completed_at_ms = ?2
             WHERE id = ?3",
            params![result, Utc::now().timestamp_millis(), request_id],
        )?;
        Ok(())
    }

    /// Terminal transition: failure with attempts exhausted
    pub fn fail_api_request(&self, request_id: i64, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE api_requests
             SET status = 'failed', error = ?1, completed_at_ms = ?2
             WHERE id = ?3",
            params![error, Utc::now().timestamp_millis(), request_id],
        )?;
        Ok(())
    }

    /// Queue-level retry: back to pending with a backoff window
    pub fn requeue_api_request(&self, request_id: i64, retry_at_ms: i64, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE api_requests
             SET status = 'pending', processing_id = NULL, retry_at_ms = ?1, error = ?2
             WHERE id = ?3",
            params![retry_at_ms, error, request_id],
        )?;
        Ok(())
    }

    /// Completed requests for a provider inside a rolling window ending now
    pub fn count_completed_since(&self, provider: &str, window_ms: i64) -> Result<u64> {
        let cutoff = Utc::now().timestamp_millis() - window_ms;
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM api_requests
             WHERE provider = ?1 AND completed_at_ms >= ?2",
            params![provider, cutoff],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Rescue `processing` rows whose claim outlived the lease: back to
    /// pending while attempts remain, terminal failed otherwise.
    pub fn reap_stale_api_requests(&self, lease_ms: i64, max_attempts: u32) -> Result<(u64, u64)> {
        let now = Utc::now().timestamp_millis();
        let cutoff = now - lease_ms;
        let conn = self.conn.lock().unwrap();

        // The driver never holds a claim longer than one dispatch, so any
        // claim older than the lease belongs to a dead instance.
        let rescued = conn.execute(
            "UPDATE api_requests
             SET status = 'pending', processing_id = NULL, claimed_at_ms = NULL,
                 retry_at_ms = NULL
             WHERE status = 'processing' AND claimed_at_ms < ?1 AND attempts < ?2",
            params![cutoff, max_attempts],
        )?;
        let expired = conn.execute(
            "UPDATE api_requests
             SET status = 'failed', error = 'reaped: stale processing claim', completed_at_ms = ?1
             WHERE status = 'processing' AND claimed_at_ms < ?2 AND attempts >= ?3",
            params![now, cutoff, max_attempts],
        )?;
        Ok((rescued as u64, expired as u64))
    }

    /// Drop terminal records past the retention window. Orphaned completions
    /// (caller timed out before the result landed) go with them.
    pub fn purge_terminal_api_requests(&self, retention_ms: i64) -> Result<u64> {
        let cutoff = Utc::now().timestamp_millis() - retention_ms;
        let conn = self.conn.lock().unwrap();
        let purged = conn.execute(
            "DELETE FROM api_requests
             WHERE status IN ('completed', 'failed') AND completed_at_ms < ?1",
            params![cutoff],
        )?;
        Ok(purged as u64)
    }

    /// Operator statistics: counts by status, recent completion rate, and
    /// estimated time to drain the pending backlog
    pub fn api_queue_stats(&self) -> Result<QueueStats> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM api_requests GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut stats = QueueStats {
            pending: 0,
            processing: 0,
            completed: 0,
            failed: 0,
            completed_last_5_min: 0,
            estimated_drain_seconds: None,
        };
        for row in rows {
            let (status, count) = row?;
            let count = count.max(0) as u64;
            match status.as_str() {
                "pending" => stats.pending = count,
                "processing" => stats.processing = count,
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                _ => {}
            }
        }

        let five_min_ago = Utc::now().timestamp_millis() - 5 * 60 * 1000;
        let recent: i64 = conn.query_row(
            "SELECT COUNT(*) FROM api_requests WHERE completed_at_ms >= ?1",
            params![five_min_ago],
            |row| row.get(0),
        )?;
        stats.completed_last_5_min = recent.max(0) as u64;

        if stats.completed_last_5_min > 0 {
            let rate_per_second = stats.completed_last_5_min as f64 / 300.0;
            stats.estimated_drain_seconds = Some((stats.pending as f64 / rate_per_second) as u64);
        }
        Ok(stats)
    }

    #[cfg(test)]
    pub fn get_api_request(&self, request_id: i64) -> Result<Option<ApiRequestRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                &format!("SELECT {} FROM api_requests WHERE id = ?1", REQUEST_COLUMNS),
                params![request_id],
                row_to_request,
            )
            .optional()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_claim_stamps_processing_id_and_attempts() {
        let db = test_db();
        let id = db
            .insert_api_request("etherscan", &serde_json::json!({"module": "account"}))
            .unwrap();

        let claimed = db
            .claim_next_api_request("etherscan", "driver-1")
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.status, RequestStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.processing_id.as_deref(), Some("driver-1"));

        // Nothing else to claim, and the claimed row is invisible
        assert!(db
            .claim_next_api_request("etherscan", "driver-2")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_retry_at_defers_claims() {
        let db = test_db();
        let id = db
            .insert_api_request("etherscan", &serde_json::json!({}))
            .unwrap();
        db.claim_next_api_request("etherscan", "d").unwrap();

        // Requeue two seconds into the future: not claimable yet
        let future = Utc::now().timestamp_millis() + 2_000;
        db.requeue_api_request(id, future, "http 500").unwrap();
        assert!(db.claim_next_api_request("etherscan", "d").unwrap().is_none());

        // Requeue in the past: claimable again with attempts preserved
        let past = Utc::now().timestamp_millis() - 1;
        db.requeue_api_request(id, past, "http 500").unwrap();
        let reclaimed = db.claim_next_api_request("etherscan", "d").unwrap().unwrap();
        assert_eq!(reclaimed.attempts, 2);
        assert_eq!(reclaimed.error.as_deref(), Some("http 500"));
    }

    #[test]
    fn test_providers_are_isolated() {
        let db = test_db();
        db.insert_api_request("gemini", &serde_json::json!({}))
            .unwrap();
        assert!(db
            .claim_next_api_request("etherscan", "d")
            .unwrap()
            .is_none());
        assert!(db.claim_next_api_request("gemini", "d").unwrap().is_some());
    }

    #[test]
    fn test_window_counts_only_completed() {
        let db = test_db();
        let id = db
            .insert_api_request("etherscan", &serde_json::json!({}))
            .unwrap();
        assert_eq!(db.count_completed_since("etherscan", 60_000).unwrap(), 0);

        db.claim_next_api_request("etherscan", "d").unwrap();
        db.complete_api_request(id, "[]").unwrap();
        assert_eq!(db.count_completed_since("etherscan", 60_000).unwrap(), 1);
        assert_eq!(db.count_completed_since("gemini", 60_000).unwrap(), 0);
    }

    #[test]
    fn test_queue_stats_estimates_drain() {
        let db = test_db();
        for _ in 0..3 {
            db.insert_api_request("etherscan", &serde_json::json!({}))
                .unwrap();
        }
        let done = db
            .claim_next_api_request("etherscan", "d")
            .unwrap()
            .unwrap();
        db.complete_api_request(done.id, "ok").unwrap();

        let stats = db.api_queue_stats().unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.completed_last_5_min, 1);
        // 2 pending / (1/300 per sec) = 600s
        assert_eq!(stats.estimated_drain_seconds, Some(600));
    }

    #[test]
    fn test_reaper_rescues_then_expires() {
        let db = test_db();
        let id = db
            .insert_api_request("etherscan", &serde_json::json!({}))
            .unwrap();
        db.claim_next_api_request("etherscan", "dead-driver").unwrap();

        // Within lease: untouched
        assert_eq!(db.reap_stale_api_requests(60_000, 3).unwrap(), (0, 0));

        // Lease expired, attempts remain: rescued to pending
        assert_eq!(db.reap_stale_api_requests(-1, 3).unwrap(), (1, 0));
        let record = db.get_api_request(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Pending);
        assert!(record.processing_id.is_none());

        // Claim until attempts are exhausted, then the reaper fails it
        db.claim_next_api_request("etherscan", "d").unwrap();
        let past = Utc::now().timestamp_millis() - 1;
        db.requeue_api_request(id, past, "err").unwrap();
        db.claim_next_api_request("etherscan", "d").unwrap();
        db.requeue_api_request(id, past, "err").unwrap();
        db.claim_next_api_request("etherscan", "d").unwrap();
        assert_eq!(db.reap_stale_api_requests(-1, 3).unwrap(), (0, 1));
        let record = db.get_api_request(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
    }
}
