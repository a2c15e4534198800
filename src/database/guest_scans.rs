use crate::database::connection::Database;
use crate::database::models::GuestScanRecord;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Store a guest scan result (12-hour freshness window)
    pub fn upsert_guest_scan(&self, wallet_address: &str, result: &serde_json::Value) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO guest_scans (wallet_address, result, last_scanned_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (wallet_address)
             DO UPDATE SET result = excluded.result,
                           last_scanned_at = excluded.last_scanned_at",
            params![
                wallet_address.to_lowercase(),
                result.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Fetch a cached guest scan no older than `max_age_hours`
    pub fn get_fresh_guest_scan(
        &self,
        wallet_address: &str,
        max_age_hours: i64,
    ) -> Result<Option<GuestScanRecord>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT wallet_address, result, last_scanned_at FROM guest_scans
                 WHERE wallet_address = ?1",
                params![wallet_address.to_lowercase()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((wallet_address, result, at)) = row else {
            return Ok(None);
        };
        let last_scanned_at = DateTime::parse_from_rfc3339(&at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now() - Duration::days(365));
        if Utc::now() - last_scanned_at > Duration::hours(max_age_hours) {
            return Ok(None);
        }
        Ok(Some(GuestScanRecord {
            wallet_address,
            result: serde_json::from_str(&result).unwrap_or(serde_json::Value::Null),
            last_scanned_at,
        }))
    }
}
