use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::Mutex;

/// Main database connection wrapper
///
/// A single SQLite connection behind a mutex. Claims on the two queues are
/// single `UPDATE ... RETURNING` statements, so claim atomicity holds even
/// with multiple processes sharing the file.
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize_tables()?;
        Ok(db)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize_tables()?;
        Ok(db)
    }

    /// Initialize all required database tables
    fn initialize_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallets (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                address TEXT NOT NULL,
                chain TEXT NOT NULL,
                label TEXT,
                last_scan_at TEXT,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, address, chain)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_tx_cache (
                id INTEGER PRIMARY KEY,
                wallet_id INTEGER NOT NULL,
                stream TEXT NOT NULL,
                block_number INTEGER NOT NULL,
                tx_json TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_watermarks (
                wallet_id INTEGER NOT NULL,
                stream TEXT NOT NULL,
                last_block INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (wallet_id, stream)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_analysis_state (
                wallet_id INTEGER NOT NULL,
                slot TEXT NOT NULL,
                fingerprints TEXT NOT NULL,
                PRIMARY KEY (wallet_id, slot)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS analysis_jobs (
                id INTEGER PRIMARY KEY,
                wallet_id INTEGER NOT NULL,
                task_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                payload TEXT,
                created_at_ms INTEGER NOT NULL,
                processed_at_ms INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_requests (
                id INTEGER PRIMARY KEY,
                provider TEXT NOT NULL,
                request_data TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                processing_id TEXT,
                claimed_at_ms INTEGER,
                retry_at_ms INTEGER,
                result TEXT,
                error TEXT,
                created_at_ms INTEGER NOT NULL,
                completed_at_ms INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reports (
                wallet_id INTEGER PRIMARY KEY,
                risk_score INTEGER NOT NULL DEFAULT 0,
                summary TEXT NOT NULL DEFAULT '',
                details TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS contract_analyses (
                contract_address TEXT NOT NULL,
                chain TEXT NOT NULL,
                analysis TEXT NOT NULL,
                last_analyzed_at TEXT NOT NULL,
                PRIMARY KEY (contract_address, chain)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS guest_scans (
                wallet_address TEXT PRIMARY KEY,
                result TEXT NOT NULL,
                last_scanned_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS address_labels (
                address TEXT NOT NULL,
                chain TEXT NOT NULL,
                label TEXT NOT NULL,
                source TEXT NOT NULL,
                PRIMARY KEY (address, chain)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS telegram_link_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            )",
            [],
        )?;

        self.create_indexes(&conn)?;
        Ok(())
    }

    /// Create database indexes for the hot queue queries
    fn create_indexes(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_api_requests_claim
             ON api_requests(provider, status, retry_at_ms, created_at_ms)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_api_requests_completed
             ON api_requests(provider, completed_at_ms)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_analysis_jobs_claim
             ON analysis_jobs(task_type, status, created_at_ms)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tx_cache_wallet
             ON wallet_tx_cache(wallet_id, stream)",
            [],
        )?;
        Ok(())
    }
}
