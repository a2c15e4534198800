/// Guest scan: a one-shot, wallet-less analysis for unregistered addresses.
///
/// Results are cached for 12 hours per address. The scan is intentionally
/// lighter than the registered pipeline: approvals and activity only, no
/// per-contract deep analysis and no stateful notifications.
use crate::adapter::explorer::{self, SortOrder};
use crate::analysis::{activity, approvals};
use crate::chains::Chain;
use crate::config::with_config;
use crate::database::models::TxStream;
use crate::database::Database;
use crate::logger::{self, LogTag};

/// Cached guest results stay fresh for this long
const GUEST_CACHE_MAX_AGE_HOURS: i64 = 12;

pub async fn guest_scan(
    db: &Database,
    chain: Chain,
    address: &str,
) -> Result<serde_json::Value, String> {
    if let Ok(Some(cached)) = db.get_fresh_guest_scan(address, GUEST_CACHE_MAX_AGE_HOURS) {
        logger::debug(
            LogTag::Queue,
            &format!("Guest scan for {} served from cache", address),
        );
        return Ok(cached.result);
    }

    let cap = with_config(|cfg| cfg.scanner.initial_scan_max_tx);
    let txs = explorer::list_transactions(
        address,
        chain,
        TxStream::Normal,
        None,
        SortOrder::Descending,
        cap,
    )
    .await
    .map_err(|e| format!("transaction fetch failed: {}", e))?;

    let intents = approvals::collect_intents(address, &txs);
    let findings = approvals::confirm_intents(chain, address, intents).await;
    let metrics = activity::compute_metrics(address, &txs);

    let details = serde_json::json!({
        "approvals": {
            "count": findings.len(),
            "items": findings,
        },
        "activity_metrics": metrics,
    });
    let score = activity::compute_risk_score(&details, &metrics);
    let summary = activity::build_summary(score, &details, &metrics);

    let result = serde_json::json!({
        "address": address.to_lowercase(),
        "chain": chain.name(),
        "risk_score": score,
        "summary": summary,
        "details": details,
    });

    if let Err(e) = db.upsert_guest_scan(address, &result) {
        logger::warning(LogTag::Queue, &format!("Guest cache write failed: {}", e));
    }
    Ok(result)
}
