//! Main execution path: config, database, services, shutdown
use crate::database;
use crate::logger::{self, LogTag};
use crate::notifications::{self, Notification};
use crate::services::implementations::{
    GatewayService, SchedulerService, WebserverService, WorkersService,
};
use crate::services::ServiceManager;
use crate::version::VERSION;

/// Full monitor lifecycle: returns once a graceful shutdown completes
pub async fn run_monitor() -> Result<(), String> {
    crate::config::load_config()?;
    logger::info(LogTag::System, "Configuration loaded");

    database::init_global_database()?;

    let mut manager = ServiceManager::new();
    register_all_services(&mut manager);
    manager.start_all().await?;

    logger::info(
        LogTag::System,
        "✅ All services started - WalletWarden is running",
    );
    if notifications::is_notification_service_enabled() {
        notifications::queue_notification(Notification::monitor_started(VERSION.to_string()));
    }

    wait_for_shutdown_signal().await?;

    logger::info(LogTag::System, "🛑 Initiating graceful shutdown...");
    manager.stop_all().await?;
    logger::info(LogTag::System, "✅ WalletWarden shut down cleanly");
    Ok(())
}

/// Register all available services; the manager orders them by priority
fn register_all_services(manager: &mut ServiceManager) {
    manager.register(Box::new(GatewayService));
    manager.register(Box::new(WorkersService));
    manager.register(Box::new(SchedulerService));
    manager.register(Box::new(WebserverService));
}

/// Wait for Ctrl+C; a second Ctrl+C during shutdown force-kills
async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::info(
        LogTag::System,
        "Running - press Ctrl+C to shut down (twice to force kill)",
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;

    logger::warning(
        LogTag::System,
        "Shutdown signal received. Press Ctrl+C again to force kill.",
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(
                LogTag::System,
                "Second Ctrl+C detected - forcing immediate exit.",
            );
            // 130 is the conventional exit code for SIGINT
            std::process::exit(130);
        }
    });

    Ok(())
}
