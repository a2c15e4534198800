//! Reset mode: wipe the local database and start fresh
use crate::config::with_config;
use crate::logger::{self, LogTag};
use std::path::Path;

pub struct ResetConfig {
    pub force: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self { force: false }
    }
}

/// Delete the database file (and SQLite WAL sidecars). Refuses without
/// `--force` so a stray invocation cannot destroy scan history.
pub fn execute_reset(config: ResetConfig) -> Result<(), String> {
    let db_path = with_config(|cfg| cfg.database_path.clone());

    if !Path::new(&db_path).exists() {
        logger::info(
            LogTag::System,
            &format!("No database at {} - nothing to reset", db_path),
        );
        return Ok(());
    }

    if !config.force {
        return Err(format!(
            "Refusing to delete {} without --force (wallet registrations, \
             scan history and analysis state will be lost)",
            db_path
        ));
    }

    for suffix in ["", "-wal", "-shm"] {
        let path = format!("{}{}", db_path, suffix);
        if Path::new(&path).exists() {
            std::fs::remove_file(&path)
                .map_err(|e| format!("Failed to delete {}: {}", path, e))?;
        }
    }
    logger::info(LogTag::System, &format!("Deleted database {}", db_path));
    Ok(())
}
