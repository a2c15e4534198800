use crate::database::connection::Database;
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

/// Link tokens expire ten minutes after creation
const LINK_TOKEN_TTL_MS: i64 = 10 * 60 * 1000;

impl Database {
    /// Issue a fresh chat-link token for a user
    pub fn create_telegram_link_token(&self, user_id: &str) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO telegram_link_tokens (token, user_id, created_at_ms)
             VALUES (?1, ?2, ?3)",
            params![token, user_id, Utc::now().timestamp_millis()],
        )?;
        Ok(token)
    }

    /// Consume a token on first valid chat binding. Returns the owning
    /// user id, or None when the token is unknown or expired.
    pub fn consume_telegram_link_token(&self, token: &str) -> Result<Option<String>> {
        let cutoff = Utc::now().timestamp_millis() - LINK_TOKEN_TTL_MS;
        let conn = self.conn.lock().unwrap();
        let user_id = conn
            .query_row(
                "DELETE FROM telegram_link_tokens
                 WHERE token = ?1 AND created_at_ms >= ?2
                 RETURNING user_id",
                params![token, cutoff],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        // Expired rows are swept opportunistically on every consume
        conn.execute(
            "DELETE FROM telegram_link_tokens WHERE created_at_ms < ?1",
            params![cutoff],
        )?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_consumed_exactly_once() {
        let db = Database::open_in_memory().unwrap();
        let token = db.create_telegram_link_token("user-7").unwrap();
        assert_eq!(
            db.consume_telegram_link_token(&token).unwrap().as_deref(),
            Some("user-7")
        );
        assert!(db.consume_telegram_link_token(&token).unwrap().is_none());
    }
}
