//! Structured logging for WalletWarden
//!
//! Provides a clean logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Colored, column-aligned console output
//!
//! ## Usage
//!
//! ```rust,ignore
//! use walletwarden::logger::{self, LogTag};
//!
//! logger::error(LogTag::Gateway, "Request dispatch failed");
//! logger::warning(LogTag::Queue, "Claim returned no rows");
//! logger::info(LogTag::Scheduler, "Enqueued 12 full scans");
//! logger::debug(LogTag::Gateway, "Tick skipped: window saturated"); // --debug-gateway
//! ```

mod core;
mod levels;
mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics, gated by --debug-<module>)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, gated by --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}
