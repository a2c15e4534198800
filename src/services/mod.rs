//! Service lifecycle management
//!
//! Every long-lived loop (gateway driver, analysis workers, scheduler,
//! webserver) is a `Service`. The manager initializes and starts them in
//! priority order, hands each the shared shutdown notifier, and waits for
//! their join handles on the way down.

mod health;
pub mod implementations;

pub use health::ServiceHealth;

use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

/// Core service trait that all services implement
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later)
    fn priority(&self) -> i32 {
        100
    }

    /// Check if service is enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Initialize the service (runs before any service starts)
    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service's background tasks
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    /// Stop the service (after the shutdown notifier fired)
    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Check service health
    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: Vec<Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
}

/// Health snapshot shared with the webserver
static HEALTH_SNAPSHOT: once_cell::sync::Lazy<Arc<RwLock<HashMap<&'static str, ServiceHealth>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(RwLock::new(HashMap::new())));

pub async fn health_snapshot() -> HashMap<&'static str, ServiceHealth> {
    HEALTH_SNAPSHOT.read().await.clone()
}

impl ServiceManager {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Register a service
    pub fn register(&mut self, service: Box<dyn Service>) {
        self.services.push(service);
    }

    /// Initialize and start all enabled services in priority order
    pub async fn start_all(&mut self) -> Result<(), String> {
        self.services.sort_by_key(|s| s.priority());

        let enabled: Vec<&'static str> = self
            .services
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name())
            .collect();
        logger::info(
            LogTag::System,
            &format!(
                "Starting {} of {} registered services",
                enabled.len(),
                self.services.len()
            ),
        );

        for service in self.services.iter_mut() {
            let name = service.name();
            if !service.is_enabled() {
                logger::info(LogTag::System, &format!("Service '{}' disabled", name));
                continue;
            }

            service
                .initialize()
                .await
                .map_err(|e| format!("Service '{}' initialize failed: {}", name, e))?;

            let handles = service
                .start(Arc::clone(&self.shutdown))
                .await
                .map_err(|e| format!("Service '{}' start failed: {}", name, e))?;
            logger::info(
                LogTag::System,
                &format!("Service '{}' started ({} tasks)", name, handles.len()),
            );
            self.handles.insert(name, handles);

            let health = service.health().await;
            HEALTH_SNAPSHOT.write().await.insert(name, health);
        }

        // Second pass once every loop has had a chance to come up
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        self.refresh_health().await;
        Ok(())
    }

    /// Refresh the health snapshot for the operator endpoint
    pub async fn refresh_health(&self) {
        let mut snapshot = HEALTH_SNAPSHOT.write().await;
        for service in &self.services {
            if self.handles.contains_key(service.name()) {
                snapshot.insert(service.name(), service.health().await);
            }
        }
    }

    /// Signal shutdown, stop services in reverse priority order, and wait
    /// for their tasks to wind down
    pub async fn stop_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "Stopping all services");
        self.shutdown.notify_waiters();

        for service in self.services.iter_mut().rev() {
            let name = service.name();
            let Some(handles) = self.handles.remove(name) else {
                continue;
            };
            if let Err(e) = service.stop().await {
                logger::warning(
                    LogTag::System,
                    &format!("Service '{}' stop reported: {}", name, e),
                );
            }
            for handle in handles {
                // A task that already finished returns an error we ignore
                let _ = tokio::time::timeout(std::time::Duration::from_secs(10), handle).await;
            }
            HEALTH_SNAPSHOT
                .write()
                .await
                .insert(name, ServiceHealth::Stopped);
            logger::info(LogTag::System, &format!("Service '{}' stopped", name));
        }
        Ok(())
    }
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}
