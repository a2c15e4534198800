use crate::database::connection::Database;
use crate::database::models::AddressLabelRecord;
use anyhow::Result;
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Persist a resolved label. Insert-only: a concurrent resolver winning
    /// the race is fine, so unique-constraint collisions are ignored.
    pub fn save_address_label(
        &self,
        address: &str,
        chain: &str,
        label: &str,
        source: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO address_labels (address, chain, label, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![address.to_lowercase(), chain, label, source],
        )?;
        Ok(())
    }

    pub fn get_address_label(
        &self,
        address: &str,
        chain: &str,
    ) -> Result<Option<AddressLabelRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT address, chain, label, source FROM address_labels
                 WHERE address = ?1 AND chain = ?2",
                params![address.to_lowercase(), chain],
                |row| {
                    Ok(AddressLabelRecord {
                        address: row.get(0)?,
                        chain: row.get(1)?,
                        label: row.get(2)?,
                        source: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
