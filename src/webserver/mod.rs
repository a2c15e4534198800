//! Operator webserver
//!
//! Localhost-only observability surface: service health, gateway queue
//! statistics (counts by status, completions in the last five minutes,
//! estimated drain time) and analysis job counts.

mod routes;
mod server;

pub use server::start_webserver;
