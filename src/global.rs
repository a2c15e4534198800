use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

/// Startup timestamp, used for uptime reporting
pub static STARTUP_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Set once the gateway driver loop is running
pub static GATEWAY_READY: AtomicBool = AtomicBool::new(false);

/// Set once all analysis workers are polling
pub static WORKERS_READY: AtomicBool = AtomicBool::new(false);

/// True when both the gateway and the workers are up
pub fn are_core_services_ready() -> bool {
    GATEWAY_READY.load(Ordering::Relaxed) && WORKERS_READY.load(Ordering::Relaxed)
}
