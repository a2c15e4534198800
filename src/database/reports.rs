use crate::database::connection::Database;
use crate::database::models::Report;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Write one analyzer's sub-section into the report's details slot,
    /// creating the report row on first write. The read-modify-write runs
    /// under the connection lock inside a transaction, so concurrent
    /// analyzers cannot lose each other's sections.
    pub fn upsert_report_section(
        &self,
        wallet_id: i64,
        section: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT details FROM reports WHERE wallet_id = ?1",
                params![wallet_id],
                |row| row.get(0),
            )
            .optional()?;

        let mut details: serde_json::Value = existing
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        details[section] = value.clone();

        tx.execute(
            "INSERT INTO reports (wallet_id, details, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (wallet_id)
             DO UPDATE SET details = excluded.details, updated_at = excluded.updated_at",
            params![wallet_id, details.to_string(), Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Finalize a cycle: the activity analyzer stamps score and summary
    pub fn set_report_score(&self, wallet_id: i64, risk_score: u8, summary: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reports (wallet_id, risk_score, summary, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (wallet_id)
             DO UPDATE SET risk_score = excluded.risk_score, summary = excluded.summary,
                           updated_at = excluded.updated_at",
            params![
                wallet_id,
                risk_score as i64,
                summary,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_report(&self, wallet_id: i64) -> Result<Option<Report>> {
        let conn = self.conn.lock().unwrap();
        let report = conn
            .query_row(
                "SELECT wallet_id, risk_score, summary, details, updated_at
                 FROM reports WHERE wallet_id = ?1",
                params![wallet_id],
                |row| {
                    let details: String = row.get(3)?;
                    let updated_at: String = row.get(4)?;
                    Ok(Report {
                        wallet_id: row.get(0)?,
                        risk_score: row.get::<_, i64>(1)?.clamp(0, 100) as u8,
                        summary: row.get(2)?,
                        details: serde_json::from_str(&details)
                            .unwrap_or(serde_json::Value::Null),
                        updated_at: DateTime::parse_from_rfc3339(&updated_at)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now()),
                    })
                },
            )
            .optional()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_accumulate_without_clobbering() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_report_section(1, "approvals", &serde_json::json!({"count": 2}))
            .unwrap();
        db.upsert_report_section(1, "contracts", &serde_json::json!({"count": 5}))
            .unwrap();
        db.set_report_score(1, 35, "2 risky approvals").unwrap();

        let report = db.get_report(1).unwrap().unwrap();
        assert_eq!(report.risk_score, 35);
        assert_eq!(report.details["approvals"]["count"], 2);
        assert_eq!(report.details["contracts"]["count"], 5);
    }

    #[test]
    fn test_section_rewrite_replaces_slot_only() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_report_section(1, "approvals", &serde_json::json!({"count": 2}))
            .unwrap();
        db.upsert_report_section(1, "approvals", &serde_json::json!({"count": 0}))
            .unwrap();
        let report = db.get_report(1).unwrap().unwrap();
        assert_eq!(report.details["approvals"]["count"], 0);
    }
}
