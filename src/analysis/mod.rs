//! Analysis pipeline
//!
//! A durable FIFO of typed jobs drives per-wallet analysis. One worker
//! task polls per task type; claims are atomic, so extra workers per type
//! would be safe too. Orchestration is decentralized: `full_scan` enqueues
//! `fetch_transactions`, which fans out to the four analyzers. There is no
//! join barrier; a failed job is marked failed and re-runs on the next
//! scheduled scan.

pub mod activity;
pub mod approvals;
pub mod contracts;
pub mod fetcher;
pub mod guest;
pub mod honeypot;
pub mod lp_stake;
pub mod selectors;
pub mod signatures;
pub mod types;

use crate::config::with_config;
use crate::database::models::{AnalysisJob, TaskType};
use crate::database::{self, Database};
use crate::global::WORKERS_READY;
use crate::logger::{self, LogTag};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Stale `processing` jobs older than this are returned to pending
const JOB_LEASE_MS: i64 = 5 * 60 * 1_000;
const JOB_REAPER_INTERVAL_SECS: u64 = 60;

/// Execute one claimed job
async fn process_job(db: &Database, job: &AnalysisJob) -> Result<(), String> {
    let wallet = db
        .get_wallet(job.wallet_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("wallet {} no longer exists", job.wallet_id))?;

    match job.task_type {
        TaskType::FullScan => {
            // Pure orchestration: stamp the scan time, hand off to the fetcher
            db.touch_last_scan(wallet.id).map_err(|e| e.to_string())?;
            db.enqueue_job(wallet.id, TaskType::FetchTransactions, None)
                .map_err(|e| e.to_string())?;
            Ok(())
        }
        TaskType::FetchTransactions => fetcher::run(db, &wallet).await,
        TaskType::AnalyzeApprovals => approvals::run(db, &wallet).await,
        TaskType::AnalyzeContracts => contracts::run(db, &wallet).await,
        TaskType::AnalyzeActivity => activity::run(db, &wallet).await,
        TaskType::AnalyzeLpStake => lp_stake::run(db, &wallet).await,
    }
}

/// Poll-claim-process loop for one task type
async fn run_worker(db: Arc<Database>, task_type: TaskType, shutdown: Arc<Notify>) {
    let poll_seconds = with_config(|cfg| cfg.scanner.worker_poll_seconds);
    logger::info(
        LogTag::Queue,
        &format!("Worker for {} polling every {}s", task_type, poll_seconds),
    );

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                logger::info(LogTag::Queue, &format!("Worker for {} stopping", task_type));
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(poll_seconds)) => {}
        }

        // Drain the backlog for this type before sleeping again
        loop {
            let job = match db.claim_next_job(task_type) {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    logger::error(
                        LogTag::Queue,
                        &format!("Claim for {} failed: {}", task_type, e),
                    );
                    break;
                }
            };

            logger::debug(
                LogTag::Queue,
                &format!("Claimed job {} ({}) for wallet {}", job.id, task_type, job.wallet_id),
            );

            match process_job(&db, &job).await {
                Ok(()) => {
                    if let Err(e) = db.complete_job(job.id) {
                        logger::error(
                            LogTag::Queue,
                            &format!("Completing job {} failed: {}", job.id, e),
                        );
                    }
                }
                Err(e) => {
                    logger::error(
                        LogTag::Queue,
                        &format!("Job {} ({}) failed: {}", job.id, task_type, e),
                    );
                    // No automatic retry; the next scheduled scan re-runs it
                    if let Err(e) = db.fail_job(job.id) {
                        logger::error(
                            LogTag::Queue,
                            &format!("Failing job {} failed: {}", job.id, e),
                        );
                    }
                }
            }
        }
    }
}

/// Spawn one worker per task type plus the stale-claim reaper
pub fn start_analysis_workers(shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
    let db = database::get_database()?;
    let mut handles = Vec::new();

    for task_type in TaskType::all() {
        let db = Arc::clone(&db);
        let shutdown = Arc::clone(&shutdown);
        handles.push(tokio::spawn(async move {
            run_worker(db, task_type, shutdown).await;
        }));
    }

    // Rescue jobs orphaned by a crashed worker
    {
        let db = Arc::clone(&db);
        let shutdown = Arc::clone(&shutdown);
        handles.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(JOB_REAPER_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = shutdown.notified() => break,
                    _ = interval.tick() => {
                        match db.reap_stale_jobs(JOB_LEASE_MS) {
                            Ok(0) => {}
                            Ok(rescued) => logger::warning(
                                LogTag::Queue,
                                &format!("Rescued {} stale analysis jobs", rescued),
                            ),
                            Err(e) => logger::error(
                                LogTag::Queue,
                                &format!("Job reaper failed: {}", e),
                            ),
                        }
                    }
                }
            }
        }));
    }

    WORKERS_READY.store(true, Ordering::Relaxed);
    logger::info(
        LogTag::Queue,
        &format!("{} analysis workers started", TaskType::all().len()),
    );
    Ok(handles)
}

/// Enqueue a full scan for a wallet (scheduler and manual re-scan path)
pub fn request_full_scan(db: &Database, wallet_id: i64) -> Result<bool, String> {
    match db.enqueue_job(wallet_id, TaskType::FullScan, None) {
        Ok(Some(_)) => Ok(true),
        Ok(None) => Ok(false),
        Err(e) => Err(e.to_string()),
    }
}
