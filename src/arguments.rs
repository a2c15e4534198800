/// Centralized argument handling for WalletWarden
///
/// Consolidates command-line argument parsing and debug flag checking.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for all modules
/// - Unified argument parsing utilities
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// MODE FLAGS
// =============================================================================

/// Run mode - starts the analysis services (required to start anything)
pub fn is_run_enabled() -> bool {
    has_arg("--run")
}

/// Reset mode - wipes the local database and exits
pub fn is_reset_enabled() -> bool {
    has_arg("--reset")
}

/// Force flag for destructive operations
pub fn is_force_enabled() -> bool {
    has_arg("--force")
}

/// Help request
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Gateway driver debug mode
pub fn is_debug_gateway_enabled() -> bool {
    has_arg("--debug-gateway")
}

/// Analysis queue debug mode
pub fn is_debug_queue_enabled() -> bool {
    has_arg("--debug-queue")
}

/// Transaction fetcher debug mode
pub fn is_debug_fetcher_enabled() -> bool {
    has_arg("--debug-fetcher")
}

/// Analyzer workers debug mode
pub fn is_debug_workers_enabled() -> bool {
    has_arg("--debug-workers")
}

/// Label service debug mode
pub fn is_debug_labels_enabled() -> bool {
    has_arg("--debug-labels")
}

/// Notification layer debug mode
pub fn is_debug_notify_enabled() -> bool {
    has_arg("--debug-notify")
}

/// Scheduler debug mode
pub fn is_debug_scheduler_enabled() -> bool {
    has_arg("--debug-scheduler")
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Print usage information
pub fn print_help() {
    println!("WalletWarden - EVM wallet security monitor");
    println!();
    println!("USAGE:");
    println!("    walletwarden --run [OPTIONS]");
    println!();
    println!("MODES:");
    println!("    --run              Start the analysis pipeline and operator webserver");
    println!("    --reset [--force]  Delete the local database and exit");
    println!("    --help             Show this help message");
    println!();
    println!("DEBUG OPTIONS:");
    println!("    --debug-gateway    Log gateway driver ticks, claims and dispatches");
    println!("    --debug-queue      Log analysis job claims and transitions");
    println!("    --debug-fetcher    Log transaction fetch batches and watermarks");
    println!("    --debug-workers    Log per-analyzer details");
    println!("    --debug-labels     Log label resolution layers");
    println!("    --debug-notify     Log notification diffing and sends");
    println!("    --debug-scheduler  Log scheduler cycles");
    println!("    --debug-all        Enable all module debug output");
    println!("    --verbose          Very detailed trace output");
}

/// Print active debug modes at startup
pub fn print_debug_info() {
    let flags = [
        "--debug-gateway",
        "--debug-queue",
        "--debug-fetcher",
        "--debug-workers",
        "--debug-labels",
        "--debug-notify",
        "--debug-scheduler",
        "--debug-all",
        "--verbose",
    ];

    let active: Vec<&str> = flags.iter().copied().filter(|f| has_arg(f)).collect();
    if !active.is_empty() {
        crate::logger::info(
            crate::logger::LogTag::System,
            &format!("Debug modes active: {}", active.join(", ")),
        );
    }
}
