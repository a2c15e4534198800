/// Activity analyzer and risk scorer
///
/// Computes wallet activity metrics from the cached normal transactions,
/// then folds the report's existing sub-sections into the final 0-100 risk
/// score. The four analyzers race; the score reflects whatever sections
/// exist at the moment this worker runs, and the next scheduled scan
/// reconverges.
use crate::analysis::types::ActivityMetrics;
use crate::database::models::{TxStream, Wallet};
use crate::database::Database;
use crate::logger::{self, LogTag};
use chrono::Utc;
use std::collections::HashSet;

// Score weights (summed, then clamped to 0-100)
const UNLIMITED_APPROVAL_WEIGHT: u64 = 10;
const UNLIMITED_APPROVAL_CAP: u64 = 30;
const LIMITED_APPROVAL_WEIGHT: u64 = 2;
const LIMITED_APPROVAL_CAP: u64 = 10;
const UNVERIFIED_CONTRACT_WEIGHT: u64 = 5;
const UNVERIFIED_CONTRACT_CAP: u64 = 25;
const VERIFIED_RISKY_WEIGHT: u64 = 3;
const VERIFIED_RISKY_CAP: u64 = 15;
const LOW_ACTIVITY_SCORE: u64 = 10;
const YOUNG_WALLET_SCORE: u64 = 10;
const LOW_ACTIVITY_TX_COUNT: u64 = 10;
const YOUNG_WALLET_AGE_DAYS: u64 = 30;

/// Compute activity metrics from the normal-transaction cache
pub fn compute_metrics(wallet_address: &str, txs: &[serde_json::Value]) -> ActivityMetrics {
    let wallet_lower = wallet_address.to_lowercase();
    let mut timestamps: Vec<i64> = Vec::new();
    let mut counterparties: HashSet<String> = HashSet::new();

    for tx in txs {
        if let Some(ts) = tx
            .get("timeStamp")
            .and_then(|t| t.as_str())
            .and_then(|t| t.parse::<i64>().ok())
        {
            timestamps.push(ts);
        }
        for key in ["from", "to"] {
            if let Some(address) = tx.get(key).and_then(|a| a.as_str()) {
                let address = address.to_lowercase();
                if !address.is_empty() && address != wallet_lower {
                    counterparties.insert(address);
                }
            }
        }
    }

    let first_tx_at = timestamps.iter().min().copied();
    let last_tx_at = timestamps.iter().max().copied();
    let wallet_age_days = first_tx_at
        .map(|first| {
            let age_secs = (Utc::now().timestamp() - first).max(0);
            (age_secs / 86_400) as u64
        })
        .unwrap_or(0);

    ActivityMetrics {
        transaction_count: txs.len() as u64,
        first_tx_at,
        last_tx_at,
        wallet_age_days,
        unique_interacted_addresses: counterparties.len() as u64,
    }
}

/// Fold the report's current sub-sections plus activity metrics into the
/// final score. Pure so the weighting is directly testable.
pub fn compute_risk_score(details: &serde_json::Value, metrics: &ActivityMetrics) -> u8 {
    let mut score: u64 = 0;

    // Approvals contribution
    let empty = Vec::new();
    let approvals = details
        .get("approvals")
        .and_then(|a| a.get("items"))
        .and_then(|i| i.as_array())
        .unwrap_or(&empty);
    let unlimited = approvals
        .iter()
        .filter(|a| {
            a.get("kind").and_then(|k| k.as_str()) == Some("erc20")
                && a.get("is_unlimited").and_then(|u| u.as_bool()) == Some(true)
        })
        .count() as u64;
    let limited = approvals
        .iter()
        .filter(|a| {
            a.get("kind").and_then(|k| k.as_str()) == Some("erc20")
                && a.get("is_unlimited").and_then(|u| u.as_bool()) == Some(false)
        })
        .count() as u64;
    score += (unlimited * UNLIMITED_APPROVAL_WEIGHT).min(UNLIMITED_APPROVAL_CAP);
    score += (limited * LIMITED_APPROVAL_WEIGHT).min(LIMITED_APPROVAL_CAP);

    // Contracts contribution
    let contracts = details.get("contracts");
    let count_of = |key: &str| -> u64 {
        contracts
            .and_then(|c| c.get(key))
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u64)
            .unwrap_or(0)
    };
    let unverified = count_of("unverifiedContracts") + count_of("unverifiedWithRisks");
    let verified_risky = count_of("verifiedContractsWithRisks");
    score += (unverified * UNVERIFIED_CONTRACT_WEIGHT).min(UNVERIFIED_CONTRACT_CAP);
    score += (verified_risky * VERIFIED_RISKY_WEIGHT).min(VERIFIED_RISKY_CAP);

    // Activity contribution. A wallet with no transactions at all gets no
    // low-activity bump (there is nothing to be inactive about); the
    // young-wallet bump still applies via the registration-age fallback.
    if metrics.transaction_count > 0 && metrics.transaction_count < LOW_ACTIVITY_TX_COUNT {
        score += LOW_ACTIVITY_SCORE;
    }
    if metrics.wallet_age_days < YOUNG_WALLET_AGE_DAYS {
        score += YOUNG_WALLET_SCORE;
    }

    score.min(100) as u8
}

/// One-line report summary derived from the score inputs
pub fn build_summary(score: u8, details: &serde_json::Value, metrics: &ActivityMetrics) -> String {
    let approvals = details
        .get("approvals")
        .and_then(|a| a.get("count"))
        .and_then(|c| c.as_u64())
        .unwrap_or(0);
    let risky_contracts = details
        .get("contracts")
        .map(|c| {
            ["unverifiedWithRisks", "verifiedContractsWithRisks"]
                .iter()
                .filter_map(|key| c.get(key).and_then(|v| v.as_array()))
                .map(|a| a.len() as u64)
                .sum::<u64>()
        })
        .unwrap_or(0);
    format!(
        "Risk score {}/100: {} standing approvals, {} risky contracts, {} transactions over {} days",
        score, approvals, risky_contracts, metrics.transaction_count, metrics.wallet_age_days
    )
}

/// Worker entrypoint; this is where a report cycle is finalized
pub async fn run(db: &Database, wallet: &Wallet) -> Result<(), String> {
    let txs = db
        .get_cached_transactions(wallet.id, TxStream::Normal)
        .map_err(|e| e.to_string())?;
    let mut metrics = compute_metrics(&wallet.address, &txs);

    // A wallet with no on-chain history still has an age: time since it
    // was registered for monitoring
    if metrics.first_tx_at.is_none() {
        let registered_days = (Utc::now() - wallet.created_at).num_days().max(0);
        metrics.wallet_age_days = registered_days as u64;
    }

    let metrics_json = serde_json::to_value(&metrics).map_err(|e| e.to_string())?;
    db.upsert_report_section(wallet.id, "activity_metrics", &metrics_json)
        .map_err(|e| format!("report write failed: {}", e))?;

    // Score whatever sections the sibling analyzers have produced so far
    let details = db
        .get_report(wallet.id)
        .map_err(|e| e.to_string())?
        .map(|r| r.details)
        .unwrap_or_else(|| serde_json::json!({}));
    let score = compute_risk_score(&details, &metrics);
    let summary = build_summary(score, &details, &metrics);

    db.set_report_score(wallet.id, score, &summary)
        .map_err(|e| format!("score write failed: {}", e))?;
    logger::info(
        LogTag::Activity,
        &format!("Wallet {}: {}", wallet.id, summary),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: &str, ts: i64) -> serde_json::Value {
        serde_json::json!({
            "from": from,
            "to": to,
            "timeStamp": ts.to_string(),
        })
    }

    const WALLET: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_metrics_exclude_self_from_counterparties() {
        let txs = vec![
            tx(WALLET, "0xaaa", 1_000),
            tx("0xaaa", WALLET, 2_000),
            tx(WALLET, WALLET, 3_000),
        ];
        let metrics = compute_metrics(WALLET, &txs);
        assert_eq!(metrics.transaction_count, 3);
        assert_eq!(metrics.unique_interacted_addresses, 1);
        assert_eq!(metrics.first_tx_at, Some(1_000));
        assert_eq!(metrics.last_tx_at, Some(3_000));
    }

    #[test]
    fn test_empty_new_wallet_scores_from_age_only() {
        let metrics = compute_metrics(WALLET, &[]);
        let score = compute_risk_score(&serde_json::json!({}), &metrics);
        // No transactions: no low-activity bump; age 0 counts as young
        assert_eq!(score, 10);
    }

    #[test]
    fn test_empty_old_wallet_scores_zero() {
        let metrics = ActivityMetrics {
            transaction_count: 0,
            wallet_age_days: 90,
            ..Default::default()
        };
        assert_eq!(compute_risk_score(&serde_json::json!({}), &metrics), 0);
    }

    #[test]
    fn test_single_unlimited_approval_contributes_ten() {
        let details = serde_json::json!({
            "approvals": { "count": 1, "items": [
                {"kind": "erc20", "is_unlimited": true}
            ]}
        });
        let metrics = ActivityMetrics {
            transaction_count: 100,
            wallet_age_days: 400,
            ..Default::default()
        };
        assert_eq!(compute_risk_score(&details, &metrics), 10);
    }

    #[test]
    fn test_approval_contributions_are_capped() {
        let unlimited: Vec<serde_json::Value> = (0..10)
            .map(|_| serde_json::json!({"kind": "erc20", "is_unlimited": true}))
            .collect();
        let limited: Vec<serde_json::Value> = (0..10)
            .map(|_| serde_json::json!({"kind": "erc20", "is_unlimited": false}))
            .collect();
        let items: Vec<serde_json::Value> =
            unlimited.into_iter().chain(limited).collect();
        let details = serde_json::json!({"approvals": {"items": items}});
        let metrics = ActivityMetrics {
            transaction_count: 100,
            wallet_age_days: 400,
            ..Default::default()
        };
        // 30 (unlimited cap) + 10 (limited cap)
        assert_eq!(compute_risk_score(&details, &metrics), 40);
    }

    #[test]
    fn test_score_clamped_to_one_hundred() {
        let unlimited: Vec<serde_json::Value> = (0..20)
            .map(|_| serde_json::json!({"kind": "erc20", "is_unlimited": true}))
            .collect();
        let unverified: Vec<serde_json::Value> = (0..20)
            .map(|i| serde_json::json!({"address": format!("0x{}", i)}))
            .collect();
        let risky: Vec<serde_json::Value> = (0..20)
            .map(|i| serde_json::json!({"address": format!("0x{}", i)}))
            .collect();
        let details = serde_json::json!({
            "approvals": {"items": unlimited},
            "contracts": {
                "unverifiedContracts": unverified,
                "unverifiedWithRisks": [],
                "verifiedContractsWithRisks": risky,
            }
        });
        let metrics = ActivityMetrics::default();
        let score = compute_risk_score(&details, &metrics);
        assert!(score <= 100);
        // 30 + 0 + 25 + 15 + 10 + 10 = 90
        assert_eq!(score, 90);
    }

    #[test]
    fn test_contract_weights() {
        let details = serde_json::json!({
            "contracts": {
                "unverifiedContracts": [{"address": "0x1"}, {"address": "0x2"}],
                "unverifiedWithRisks": [{"address": "0x3"}],
                "verifiedContractsWithRisks": [{"address": "0x4"}],
            }
        });
        let metrics = ActivityMetrics {
            transaction_count: 100,
            wallet_age_days: 400,
            ..Default::default()
        };
        // 3 unverified * 5 + 1 verified-risky * 3
        assert_eq!(compute_risk_score(&details, &metrics), 18);
    }
}
