use walletwarden::{
    arguments::{
        is_force_enabled, is_help_requested, is_reset_enabled, is_run_enabled, print_debug_info,
        print_help,
    },
    logger::{self, LogTag},
};

/// Main entry point for WalletWarden
///
/// Routes execution based on command-line arguments:
/// - `--help`: Display help information and exit
/// - `--reset [--force]`: Delete the local database and exit
/// - `--run`: Start the analysis pipeline and operator webserver
#[tokio::main]
async fn main() {
    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "🛡️ WalletWarden starting up...");
    print_debug_info();

    if is_reset_enabled() {
        let config = walletwarden::reset::ResetConfig {
            force: is_force_enabled(),
        };
        match walletwarden::reset::execute_reset(config) {
            Ok(()) => {
                logger::info(LogTag::System, "✅ Reset completed");
                std::process::exit(0);
            }
            Err(e) => {
                logger::error(LogTag::System, &format!("❌ Reset failed: {}", e));
                std::process::exit(1);
            }
        }
    }

    if !is_run_enabled() {
        logger::error(LogTag::System, "No execution mode specified");
        print_help();
        std::process::exit(1);
    }

    match walletwarden::run::run_monitor().await {
        Ok(()) => {
            logger::info(LogTag::System, "✅ WalletWarden exited");
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("❌ WalletWarden failed: {}", e));
            std::process::exit(1);
        }
    }
}
