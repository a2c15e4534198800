//! Rate-limited outbound request gateway
//!
//! All outbound HTTP traffic (blockchain explorer, AI provider) flows
//! through this singleton queue. Callers submit logical requests and await
//! the result; requests are persisted, rate-limited per provider across
//! three rolling windows, retried with exponential backoff on transient
//! failures, and completed by waking exactly the submitting caller.
//!
//! The driver loop ticks at ~5 Hz and claims at most one request per
//! provider per tick. Claims are atomic database updates, so several
//! gateway processes can safely share one queue; the in-process waiter
//! registry only ever serves callers of this process.

mod limits;
mod providers;
mod types;
mod waiters;

pub use types::{ApiProvider, RequestData};
pub use waiters::RequestOutcome;

use crate::config::with_config;
use crate::database::{self, Database};
use crate::errors::WardenError;
use crate::global::GATEWAY_READY;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;
use waiters::WaiterRegistry;

/// Driver cadence (~5 Hz)
const TICK_INTERVAL_MS: u64 = 200;
/// Reaper cadence and lease for stale `processing` claims
const REAPER_INTERVAL_SECS: u64 = 60;
const CLAIM_LEASE_MS: i64 = 5 * 60 * 1_000;
/// Terminal records older than this are purged (covers orphaned
/// completions whose caller timed out)
const TERMINAL_RETENTION_MS: i64 = 60 * 60 * 1_000;

pub struct Gateway {
    db: Arc<Database>,
    client: reqwest::Client,
    waiters: WaiterRegistry,
    /// Stamped into every claim this instance makes
    instance_id: String,
    /// Reentrancy guard: a tick overlapping a slow iteration is skipped
    tick_in_progress: AtomicBool,
}

impl Gateway {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            client: reqwest::Client::new(),
            waiters: WaiterRegistry::new(),
            instance_id: Uuid::new_v4().to_string(),
            tick_in_progress: AtomicBool::new(false),
        }
    }

    /// Submit a logical request and await its result.
    ///
    /// The request is persisted immediately; the caller blocks on a
    /// one-shot handle until the driver finalizes the record or the
    /// timeout fires. On timeout the waiter is removed and the persisted
    /// record is left to complete (and later be reaped) on its own.
    pub async fn submit(
        &self,
        provider: ApiProvider,
        request_data: RequestData,
    ) -> Result<String, WardenError> {
        let payload = serde_json::to_value(&request_data)?;
        let request_id = self
            .db
            .insert_api_request(provider.as_str(), &payload)
            .map_err(|e| WardenError::database(e.to_string()))?;

        let receiver = self.waiters.register(request_id);
        let timeout_seconds = with_config(|cfg| cfg.gateway.request_timeout_seconds);

        match tokio::time::timeout(Duration::from_secs(timeout_seconds), receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                // Sender dropped without signaling; treat like a timeout
                self.waiters.remove(request_id);
                Err(WardenError::Timeout {
                    seconds: timeout_seconds,
                })
            }
            Err(_) => {
                self.waiters.remove(request_id);
                logger::warning(
                    LogTag::Gateway,
                    &format!(
                        "Request {} to {} timed out after {}s (record may complete later)",
                        request_id, provider, timeout_seconds
                    ),
                );
                Err(WardenError::Timeout {
                    seconds: timeout_seconds,
                })
            }
        }
    }

    /// One driver tick: walk every provider, claim and dispatch at most
    /// one request each.
    pub async fn tick(&self) {
        // Overlapping ticks must not double-dispatch
        if self
            .tick_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        for provider in ApiProvider::all() {
            if let Err(e) = self.process_provider(provider).await {
                logger::error(
                    LogTag::Gateway,
                    &format!("Provider pass for {} failed: {}", provider, e),
                );
            }
        }

        self.tick_in_progress.store(false, Ordering::SeqCst);
    }

    async fn process_provider(&self, provider: ApiProvider) -> Result<(), String> {
        // Largest window first: a blown day quota makes the rest moot
        match limits::saturated_window(&self.db, provider) {
            Ok(None) => {}
            Ok(Some(window)) => {
                logger::verbose(
                    LogTag::Gateway,
                    &format!("{} {} window saturated, skipping", provider, window),
                );
                return Ok(());
            }
            Err(e) => return Err(format!("window check failed: {}", e)),
        }

        let claimed = self
            .db
            .claim_next_api_request(provider.as_str(), &self.instance_id)
            .map_err(|e| format!("claim failed: {}", e))?;
        let Some(record) = claimed else {
            return Ok(());
        };

        let request_data: RequestData = serde_json::from_value(record.request_data.clone())
            .map_err(|e| format!("request {} has malformed payload: {}", record.id, e))?;

        logger::debug(
            LogTag::Gateway,
            &format!(
                "Dispatching request {} to {} (attempt {})",
                record.id, provider, record.attempts
            ),
        );

        match providers::dispatch(&self.client, provider, &request_data).await {
            Ok(result) => {
                self.db
                    .complete_api_request(record.id, &result)
                    .map_err(|e| format!("finalize failed: {}", e))?;
                self.waiters.signal(record.id, Ok(result));
            }
            Err(err) => self.handle_dispatch_failure(record.id, record.attempts, err)?,
        }
        Ok(())
    }

    fn handle_dispatch_failure(
        &self,
        request_id: i64,
        attempts: u32,
        err: WardenError,
    ) -> Result<(), String> {
        let max_attempts = with_config(|cfg| cfg.gateway.max_attempts);

        if err.is_transient() && attempts < max_attempts {
            // Exponential backoff: 2^attempts seconds after the n-th attempt
            let backoff_ms = 2i64.pow(attempts).saturating_mul(1_000);
            let retry_at = chrono::Utc::now().timestamp_millis() + backoff_ms;
            self.db
                .requeue_api_request(request_id, retry_at, &err.to_string())
                .map_err(|e| format!("requeue failed: {}", e))?;
            logger::debug(
                LogTag::Gateway,
                &format!(
                    "Request {} requeued (attempt {}/{}, retry in {}s): {}",
                    request_id,
                    attempts,
                    max_attempts,
                    backoff_ms / 1_000,
                    err
                ),
            );
        } else {
            self.db
                .fail_api_request(request_id, &err.to_string())
                .map_err(|e| format!("fail transition failed: {}", e))?;
            logger::warning(
                LogTag::Gateway,
                &format!("Request {} terminally failed: {}", request_id, err),
            );
            self.waiters.signal(request_id, Err(err));
        }
        Ok(())
    }

    /// One reaper pass: rescue stale claims, purge old terminal rows
    pub fn reap(&self) {
        let max_attempts = with_config(|cfg| cfg.gateway.max_attempts);
        match self.db.reap_stale_api_requests(CLAIM_LEASE_MS, max_attempts) {
            Ok((rescued, expired)) if rescued > 0 || expired > 0 => {
                logger::warning(
                    LogTag::Gateway,
                    &format!(
                        "Reaper rescued {} and expired {} stale requests",
                        rescued, expired
                    ),
                );
            }
            Ok(_) => {}
            Err(e) => logger::error(LogTag::Gateway, &format!("Reaper pass failed: {}", e)),
        }
        if let Err(e) = self.db.purge_terminal_api_requests(TERMINAL_RETENTION_MS) {
            logger::error(LogTag::Gateway, &format!("Purge pass failed: {}", e));
        }
    }
}

// =============================================================================
// GLOBAL INSTANCE + LOOPS
// =============================================================================

static GLOBAL_GATEWAY: OnceCell<Arc<Gateway>> = OnceCell::new();

/// Create the process-wide gateway instance
pub fn init_global_gateway() -> Result<(), String> {
    let db = database::get_database()?;
    GLOBAL_GATEWAY
        .set(Arc::new(Gateway::new(db)))
        .map_err(|_| "Gateway already initialized".to_string())
}

pub fn get_gateway() -> Result<Arc<Gateway>, String> {
    GLOBAL_GATEWAY
        .get()
        .cloned()
        .ok_or_else(|| "Gateway not initialized".to_string())
}

/// Submit through the global gateway
pub async fn submit(
    provider: ApiProvider,
    request_data: RequestData,
) -> Result<String, WardenError> {
    let gateway = get_gateway().map_err(WardenError::configuration)?;
    gateway.submit(provider, request_data).await
}

/// Spawn the driver and reaper loops
pub fn start_gateway_loops(shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
    let gateway = get_gateway()?;

    let driver = {
        let gateway = Arc::clone(&gateway);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
            GATEWAY_READY.store(true, Ordering::Relaxed);
            logger::info(LogTag::Gateway, "Gateway driver loop started");
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    _ = interval.tick() => gateway.tick().await,
                }
            }
            GATEWAY_READY.store(false, Ordering::Relaxed);
            logger::info(LogTag::Gateway, "Gateway driver loop stopped");
        })
    };

    let reaper = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(REAPER_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    _ = interval.tick() => gateway.reap(),
                }
            }
        })
    };

    Ok(vec![driver, reaper])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RequestStatus;

    fn test_gateway() -> Gateway {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Gateway::new(db)
    }

    #[tokio::test]
    async fn test_transient_failure_requeues_with_backoff() {
        let gateway = test_gateway();
        let id = gateway
            .db
            .insert_api_request("etherscan", &serde_json::json!({}))
            .unwrap();
        gateway
            .db
            .claim_next_api_request("etherscan", "t")
            .unwrap()
            .unwrap();

        gateway
            .handle_dispatch_failure(id, 1, WardenError::transient("etherscan", "HTTP 500"))
            .unwrap();

        let record = gateway.db.get_api_request(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Pending);
        let retry_at = record.retry_at_ms.unwrap();
        let expected = chrono::Utc::now().timestamp_millis() + 2_000;
        assert!((retry_at - expected).abs() < 500, "2^1 seconds of backoff");
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fail_terminally() {
        let gateway = test_gateway();
        let id = gateway
            .db
            .insert_api_request("etherscan", &serde_json::json!({}))
            .unwrap();
        let rx = gateway.waiters.register(id);

        gateway
            .handle_dispatch_failure(id, 3, WardenError::transient("etherscan", "HTTP 500"))
            .unwrap();

        let record = gateway.db.get_api_request(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(record.completed_at_ms.is_some());
        // The caller is rejected with the last error
        assert!(rx.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_permanent_failure_skips_retry() {
        let gateway = test_gateway();
        let id = gateway
            .db
            .insert_api_request("gemini", &serde_json::json!({}))
            .unwrap();
        let rx = gateway.waiters.register(id);

        gateway
            .handle_dispatch_failure(id, 1, WardenError::permanent("gemini", "content filtered"))
            .unwrap();

        let record = gateway.db.get_api_request(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(rx.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_tick_reentrancy_guard_skips_overlap() {
        let gateway = test_gateway();
        gateway.tick_in_progress.store(true, Ordering::SeqCst);
        // Must return immediately instead of claiming anything
        gateway
            .db
            .insert_api_request("etherscan", &serde_json::json!({"kind": "generate", "prompt": "x"}))
            .unwrap();
        gateway.tick().await;
        let stats = gateway.db.api_queue_stats().unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 0);
    }
}
