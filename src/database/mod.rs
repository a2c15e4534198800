//! SQLite persistence layer
//!
//! One connection behind a mutex; queue claims are single
//! `UPDATE ... RETURNING` statements so exactly-once claim semantics hold
//! for both the analysis queue and the gateway request queue.

pub mod connection;
pub mod models;

mod contracts;
mod guest_scans;
mod jobs;
mod labels;
mod reports;
mod requests;
mod telegram_links;
mod wallets;

pub use connection::Database;

use crate::config::with_config;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_DATABASE: OnceCell<Arc<Database>> = OnceCell::new();

/// Open the process-wide database at the configured path
pub fn init_global_database() -> Result<(), String> {
    let path = with_config(|cfg| cfg.database_path.clone());
    let db = Database::new(&path).map_err(|e| format!("Failed to open database: {}", e))?;
    logger::info(LogTag::Database, &format!("Database ready at {}", path));
    GLOBAL_DATABASE
        .set(Arc::new(db))
        .map_err(|_| "Database already initialized".to_string())
}

/// Shared handle to the process-wide database
pub fn get_database() -> Result<Arc<Database>, String> {
    GLOBAL_DATABASE
        .get()
        .cloned()
        .ok_or_else(|| "Database not initialized".to_string())
}

