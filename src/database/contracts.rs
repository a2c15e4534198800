use crate::database::connection::Database;
use crate::database::models::StoredContractAnalysis;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

impl Database {
    /// Cache a contract analysis result (24-hour freshness window)
    pub fn upsert_contract_analysis(
        &self,
        contract_address: &str,
        chain: &str,
        analysis: &serde_json::Value,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO contract_analyses (contract_address, chain, analysis, last_analyzed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (contract_address, chain)
             DO UPDATE SET analysis = excluded.analysis,
                           last_analyzed_at = excluded.last_analyzed_at",
            params![
                contract_address.to_lowercase(),
                chain,
                analysis.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Fetch a cached analysis no older than `max_age_hours`
    pub fn get_fresh_contract_analysis(
        &self,
        contract_address: &str,
        chain: &str,
        max_age_hours: i64,
    ) -> Result<Option<StoredContractAnalysis>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT contract_address, chain, analysis, last_analyzed_at
                 FROM contract_analyses WHERE contract_address = ?1 AND chain = ?2",
                params![contract_address.to_lowercase(), chain],
                |row| {
                    let analysis: String = row.get(2)?;
                    let at: String = row.get(3)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        analysis,
                        at,
                    ))
                },
            )
            .optional()?;

        let Some((contract_address, chain, analysis, at)) = row else {
            return Ok(None);
        };
        let last_analyzed_at = DateTime::parse_from_rfc3339(&at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now() - Duration::days(365));

        if Utc::now() - last_analyzed_at > Duration::hours(max_age_hours) {
            return Ok(None);
        }
        Ok(Some(StoredContractAnalysis {
            contract_address,
            chain,
            analysis: serde_json::from_str(&analysis).unwrap_or(serde_json::Value::Null),
            last_analyzed_at,
        }))
    }
}
