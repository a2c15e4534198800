/// Crate version, surfaced in /status and startup logs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
