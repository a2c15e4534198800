use crate::services::Service;
use crate::webserver;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Operator observability endpoint
pub struct WebserverService;

#[async_trait]
impl Service for WebserverService {
    fn name(&self) -> &'static str {
        "webserver"
    }

    // Last up: everything it reports on should already be running
    fn priority(&self) -> i32 {
        90
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let handle = webserver::start_webserver(shutdown).await?;
        Ok(vec![handle])
    }
}
