/// Rolling-window rate limit checks
///
/// Windows are measured from `now` over completed requests, per provider.
/// Checks run largest window first so a saturated day quota short-circuits
/// the cheaper checks.
use crate::database::Database;
use crate::gateway::types::ApiProvider;
use anyhow::Result;

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * 1_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1_000;

/// Returns the name of the first saturated window (day → minute → second),
/// or None when the provider may dispatch.
pub fn saturated_window(db: &Database, provider: ApiProvider) -> Result<Option<&'static str>> {
    let limits = provider.limits();

    if db.count_completed_since(provider.as_str(), DAY_MS)? >= limits.per_day {
        return Ok(Some("day"));
    }
    if db.count_completed_since(provider.as_str(), MINUTE_MS)? >= limits.per_minute {
        return Ok(Some("minute"));
    }
    if db.count_completed_since(provider.as_str(), SECOND_MS)? >= limits.per_second {
        return Ok(Some("second"));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_one(db: &Database, provider: ApiProvider) {
        let id = db
            .insert_api_request(provider.as_str(), &serde_json::json!({}))
            .unwrap();
        db.claim_next_api_request(provider.as_str(), "test").unwrap();
        db.complete_api_request(id, "ok").unwrap();
    }

    #[test]
    fn test_second_window_saturates_at_limit() {
        let db = Database::open_in_memory().unwrap();
        // Default explorer limit: 4 per second
        for _ in 0..3 {
            complete_one(&db, ApiProvider::Etherscan);
        }
        assert_eq!(saturated_window(&db, ApiProvider::Etherscan).unwrap(), None);

        complete_one(&db, ApiProvider::Etherscan);
        assert_eq!(
            saturated_window(&db, ApiProvider::Etherscan).unwrap(),
            Some("second")
        );
    }

    #[test]
    fn test_limits_are_per_provider() {
        let db = Database::open_in_memory().unwrap();
        // Default AI limit: 1 per second
        complete_one(&db, ApiProvider::Gemini);
        assert_eq!(
            saturated_window(&db, ApiProvider::Gemini).unwrap(),
            Some("second")
        );
        assert_eq!(saturated_window(&db, ApiProvider::Etherscan).unwrap(), None);
    }
}
