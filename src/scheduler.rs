//! Periodic scheduler
//!
//! Every `SCAN_INTERVAL_HOURS` (default 24) a `full_scan` job is enqueued
//! for every registered wallet. Wallets that already have a scan pending
//! or in flight are skipped so a slow cycle never piles up duplicate work.
use crate::analysis;
use crate::config::with_config;
use crate::database::models::TaskType;
use crate::database::{self, Database};
use crate::logger::{self, LogTag};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// One scheduling pass over all registered wallets
pub fn schedule_full_scans(db: &Database) -> Result<usize, String> {
    let wallets = db.list_wallets().map_err(|e| e.to_string())?;
    let mut enqueued = 0;

    for wallet in &wallets {
        match db.has_active_job(wallet.id, TaskType::FullScan) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                logger::warning(
                    LogTag::Scheduler,
                    &format!("Active-job check for wallet {} failed: {}", wallet.id, e),
                );
                continue;
            }
        }
        if analysis::request_full_scan(db, wallet.id)? {
            enqueued += 1;
        }
    }

    if enqueued > 0 {
        logger::info(
            LogTag::Scheduler,
            &format!(
                "Enqueued {} full scans ({} wallets registered)",
                enqueued,
                wallets.len()
            ),
        );
    }
    Ok(enqueued)
}

/// Spawn the scheduler loop
pub fn start_scheduler(shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
    let db = database::get_database()?;
    let interval_hours = with_config(|cfg| cfg.scanner.scan_interval_hours);

    let handle = tokio::spawn(async move {
        logger::info(
            LogTag::Scheduler,
            &format!("Scheduler running every {}h", interval_hours),
        );
        let mut interval =
            tokio::time::interval(Duration::from_secs(interval_hours * 3_600));
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    logger::info(LogTag::Scheduler, "Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = schedule_full_scans(&db) {
                        logger::error(
                            LogTag::Scheduler,
                            &format!("Scheduling pass failed: {}", e),
                        );
                    }
                }
            }
        }
    });
    Ok(vec![handle])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_enqueues_once_per_wallet() {
        let db = Database::open_in_memory().unwrap();
        db.register_wallet("u1", "0xaaa", "ethereum", None).unwrap();
        db.register_wallet("u1", "0xbbb", "polygon", None).unwrap();

        assert_eq!(schedule_full_scans(&db).unwrap(), 2);
        // Second pass: scans still pending, nothing new
        assert_eq!(schedule_full_scans(&db).unwrap(), 0);

        // Once a scan is claimed (processing), still no duplicate
        db.claim_next_job(TaskType::FullScan).unwrap().unwrap();
        assert_eq!(schedule_full_scans(&db).unwrap(), 0);

        // After completion the next cycle schedules again
        let job = db.claim_next_job(TaskType::FullScan).unwrap().unwrap();
        db.complete_job(job.id).unwrap();
        assert_eq!(schedule_full_scans(&db).unwrap(), 1);
    }
}
