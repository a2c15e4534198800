use crate::analysis;
use crate::global::WORKERS_READY;
use crate::notifications;
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// The analysis worker family: one poll-claim-process loop per task type
pub struct WorkersService;

#[async_trait]
impl Service for WorkersService {
    fn name(&self) -> &'static str {
        "analysis-workers"
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn initialize(&mut self) -> Result<(), String> {
        // Workers emit alerts, so the notifier must exist first
        notifications::init_notification_service();
        Ok(())
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        analysis::start_analysis_workers(shutdown)
    }

    async fn stop(&mut self) -> Result<(), String> {
        WORKERS_READY.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn health(&self) -> ServiceHealth {
        if WORKERS_READY.load(Ordering::Relaxed) {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Starting
        }
    }
}
