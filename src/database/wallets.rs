use crate::database::connection::Database;
use crate::database::models::{StateSlot, TxStream, Wallet};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;

fn row_to_wallet(row: &Row) -> rusqlite::Result<Wallet> {
    let last_scan_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Wallet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        address: row.get(2)?,
        chain: row.get(3)?,
        label: row.get(4)?,
        last_scan_at: last_scan_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

const WALLET_COLUMNS: &str = "id, user_id, address, chain, label, last_scan_at, created_at";

impl Database {
    /// Register a wallet; returns the existing row on duplicate registration
    pub fn register_wallet(
        &self,
        user_id: &str,
        address: &str,
        chain: &str,
        label: Option<&str>,
    ) -> Result<Wallet> {
        let address = address.to_lowercase();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO wallets (user_id, address, chain, label, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, address, chain, label, Utc::now().to_rfc3339()],
        )?;
        let wallet = conn.query_row(
            &format!(
                "SELECT {} FROM wallets WHERE user_id = ?1 AND address = ?2 AND chain = ?3",
                WALLET_COLUMNS
            ),
            params![user_id, address, chain],
            row_to_wallet,
        )?;
        Ok(wallet)
    }

    pub fn get_wallet(&self, wallet_id: i64) -> Result<Option<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let wallet = conn
            .query_row(
                &format!("SELECT {} FROM wallets WHERE id = ?1", WALLET_COLUMNS),
                params![wallet_id],
                row_to_wallet,
            )
            .optional()?;
        Ok(wallet)
    }

    pub fn list_wallets(&self) -> Result<Vec<Wallet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wallets ORDER BY id",
            WALLET_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_wallet)?;
        let mut wallets = Vec::new();
        for wallet in rows {
            wallets.push(wallet?);
        }
        Ok(wallets)
    }

    /// Delete a wallet and everything hanging off it
    pub fn delete_wallet(&self, wallet_id: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM wallet_tx_cache WHERE wallet_id = ?1",
            params![wallet_id],
        )?;
        tx.execute(
            "DELETE FROM wallet_watermarks WHERE wallet_id = ?1",
            params![wallet_id],
        )?;
        tx.execute(
            "DELETE FROM wallet_analysis_state WHERE wallet_id = ?1",
            params![wallet_id],
        )?;
        tx.execute(
            "DELETE FROM analysis_jobs WHERE wallet_id = ?1",
            params![wallet_id],
        )?;
        tx.execute(
            "DELETE FROM reports WHERE wallet_id = ?1",
            params![wallet_id],
        )?;
        tx.execute("DELETE FROM wallets WHERE id = ?1", params![wallet_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Stamp the wallet's last full-scan time
    pub fn touch_last_scan(&self, wallet_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE wallets SET last_scan_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), wallet_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // TRANSACTION CACHE
    // =========================================================================

    /// Append fetched transactions to a stream's cache and advance the
    /// watermark in the same transaction. The watermark only moves forward.
    pub fn append_transactions(
        &self,
        wallet_id: i64,
        stream: TxStream,
        txs: &[serde_json::Value],
        max_block_seen: u64,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for entry in txs {
            let block = entry
                .get("blockNumber")
                .and_then(|b| b.as_str())
                .and_then(|b| b.parse::<i64>().ok())
                .unwrap_or(0);
            tx.execute(
                "INSERT INTO wallet_tx_cache (wallet_id, stream, block_number, tx_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![wallet_id, stream.as_str(), block, entry.to_string()],
            )?;
        }
        tx.execute(
            "INSERT INTO wallet_watermarks (wallet_id, stream, last_block)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (wallet_id, stream)
             DO UPDATE SET last_block = MAX(last_block, excluded.last_block)",
            params![wallet_id, stream.as_str(), max_block_seen as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Highest block already ingested for a stream (0 = never fetched)
    pub fn get_watermark(&self, wallet_id: i64, stream: TxStream) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let block: Option<i64> = conn
            .query_row(
                "SELECT last_block FROM wallet_watermarks WHERE wallet_id = ?1 AND stream = ?2",
                params![wallet_id, stream.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block.unwrap_or(0).max(0) as u64)
    }

    /// All cached transactions for a stream, oldest block first
    pub fn get_cached_transactions(
        &self,
        wallet_id: i64,
        stream: TxStream,
    ) -> Result<Vec<serde_json::Value>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tx_json FROM wallet_tx_cache
             WHERE wallet_id = ?1 AND stream = ?2 ORDER BY block_number ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![wallet_id, stream.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut txs = Vec::new();
        for raw in rows {
            if let Ok(value) = serde_json::from_str(&raw?) {
                txs.push(value);
            }
        }
        Ok(txs)
    }

    // =========================================================================
    // ANALYSIS STATE (fingerprint sets)
    // =========================================================================

    /// Previously seen fingerprints for an analyzer's slot
    pub fn get_analysis_state(&self, wallet_id: i64, slot: StateSlot) -> Result<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT fingerprints FROM wallet_analysis_state
                 WHERE wallet_id = ?1 AND slot = ?2",
                params![wallet_id, slot.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let set = raw
            .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
            .map(|v| v.into_iter().collect())
            .unwrap_or_default();
        Ok(set)
    }

    /// Replace a slot's fingerprint set
    pub fn set_analysis_state(
        &self,
        wallet_id: i64,
        slot: StateSlot,
        fingerprints: &HashSet<String>,
    ) -> Result<()> {
        let mut sorted: Vec<&String> = fingerprints.iter().collect();
        sorted.sort();
        let json = serde_json::to_string(&sorted)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO wallet_analysis_state (wallet_id, slot, fingerprints)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (wallet_id, slot) DO UPDATE SET fingerprints = excluded.fingerprints",
            params![wallet_id, slot.as_str(), json],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_register_is_idempotent() {
        let db = test_db();
        let first = db
            .register_wallet("user-1", "0xABCD", "ethereum", Some("main"))
            .unwrap();
        let second = db
            .register_wallet("user-1", "0xabcd", "ethereum", None)
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.address, "0xabcd");
    }

    #[test]
    fn test_watermark_is_monotone() {
        let db = test_db();
        let wallet = db
            .register_wallet("user-1", "0xabc", "ethereum", None)
            .unwrap();

        db.append_transactions(wallet.id, TxStream::Normal, &[], 100)
            .unwrap();
        assert_eq!(db.get_watermark(wallet.id, TxStream::Normal).unwrap(), 100);

        // A lower max never rewinds the watermark
        db.append_transactions(wallet.id, TxStream::Normal, &[], 50)
            .unwrap();
        assert_eq!(db.get_watermark(wallet.id, TxStream::Normal).unwrap(), 100);

        db.append_transactions(wallet.id, TxStream::Normal, &[], 150)
            .unwrap();
        assert_eq!(db.get_watermark(wallet.id, TxStream::Normal).unwrap(), 150);
    }

    #[test]
    fn test_delete_wallet_cascades() {
        let db = test_db();
        let wallet = db
            .register_wallet("user-1", "0xabc", "ethereum", None)
            .unwrap();
        db.append_transactions(
            wallet.id,
            TxStream::Normal,
            &[serde_json::json!({"blockNumber": "7", "hash": "0x1"})],
            7,
        )
        .unwrap();
        let mut state = HashSet::new();
        state.insert("erc20-0xtoken-0xspender".to_string());
        db.set_analysis_state(wallet.id, StateSlot::Approvals, &state)
            .unwrap();

        db.delete_wallet(wallet.id).unwrap();

        assert!(db.get_wallet(wallet.id).unwrap().is_none());
        assert!(db
            .get_cached_transactions(wallet.id, TxStream::Normal)
            .unwrap()
            .is_empty());
        assert!(db
            .get_analysis_state(wallet.id, StateSlot::Approvals)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_analysis_state_round_trip() {
        let db = test_db();
        let wallet = db
            .register_wallet("user-1", "0xabc", "ethereum", None)
            .unwrap();
        let mut fingerprints = HashSet::new();
        fingerprints.insert("erc20-0xa-0xb".to_string());
        fingerprints.insert("nft-0xc-0xd".to_string());

        db.set_analysis_state(wallet.id, StateSlot::Approvals, &fingerprints)
            .unwrap();
        let loaded = db
            .get_analysis_state(wallet.id, StateSlot::Approvals)
            .unwrap();
        assert_eq!(loaded, fingerprints);

        // The contracts slot is independent
        assert!(db
            .get_analysis_state(wallet.id, StateSlot::Contracts)
            .unwrap()
            .is_empty());
    }
}
