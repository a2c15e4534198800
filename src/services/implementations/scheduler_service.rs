use crate::scheduler;
use crate::services::Service;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Periodic full-scan scheduling
pub struct SchedulerService;

#[async_trait]
impl Service for SchedulerService {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    // Starts after the workers so the first cycle has consumers
    fn priority(&self) -> i32 {
        30
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        scheduler::start_scheduler(shutdown)
    }
}
