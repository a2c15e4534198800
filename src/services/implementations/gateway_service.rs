use crate::gateway;
use crate::global::GATEWAY_READY;
use crate::services::{Service, ServiceHealth};
use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Owns the outbound request queue: driver loop plus reaper
pub struct GatewayService;

#[async_trait]
impl Service for GatewayService {
    fn name(&self) -> &'static str {
        "gateway"
    }

    // The gateway must be up before anything that submits requests
    fn priority(&self) -> i32 {
        10
    }

    async fn initialize(&mut self) -> Result<(), String> {
        gateway::init_global_gateway()
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        gateway::start_gateway_loops(shutdown)
    }

    async fn health(&self) -> ServiceHealth {
        if GATEWAY_READY.load(Ordering::Relaxed) {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Starting
        }
    }
}
