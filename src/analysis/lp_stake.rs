/// LP/stake analyzer
///
/// Flags contracts that once received liquidity or stake from the wallet
/// as potential forgotten positions. Detection is purely calldata-based;
/// whether the position still exists is for the user to check, which is
/// exactly the point of surfacing it.
use crate::adapter::abi;
use crate::analysis::signatures::LP_STAKE_SIGNATURES;
use crate::analysis::types::PotentialPosition;
use crate::chains::Chain;
use crate::database::models::{TxStream, Wallet};
use crate::database::Database;
use crate::labels;
use crate::logger::{self, LogTag};
use std::collections::HashMap;

/// Collect distinct deposit-like destinations from the wallet's outgoing
/// transactions, keeping the most recent call per contract
pub fn collect_positions(wallet_address: &str, txs: &[serde_json::Value]) -> Vec<PotentialPosition> {
    let wallet_lower = wallet_address.to_lowercase();
    let mut by_contract: HashMap<String, PotentialPosition> = HashMap::new();

    for tx in txs {
        let from = tx.get("from").and_then(|f| f.as_str()).unwrap_or("");
        if from.to_lowercase() != wallet_lower {
            continue;
        }
        let Some(to) = tx.get("to").and_then(|t| t.as_str()) else {
            continue;
        };
        let input = tx.get("input").and_then(|i| i.as_str()).unwrap_or("");
        let Some(parsed) = abi::parse_input(input, &LP_STAKE_SIGNATURES) else {
            continue;
        };
        let block = tx
            .get("blockNumber")
            .and_then(|b| b.as_str())
            .and_then(|b| b.parse::<u64>().ok())
            .unwrap_or(0);

        let contract = to.to_lowercase();
        let entry = by_contract
            .entry(contract.clone())
            .or_insert(PotentialPosition {
                contract,
                label: None,
                function: parsed.signature.clone(),
                last_seen_block: block,
            });
        if block >= entry.last_seen_block {
            entry.last_seen_block = block;
            entry.function = parsed.signature;
        }
    }

    let mut positions: Vec<PotentialPosition> = by_contract.into_values().collect();
    positions.sort_by(|a, b| a.contract.cmp(&b.contract));
    positions
}

/// Worker entrypoint
pub async fn run(db: &Database, wallet: &Wallet) -> Result<(), String> {
    let chain = Chain::parse(&wallet.chain)
        .ok_or_else(|| format!("unsupported chain {}", wallet.chain))?;
    let txs = db
        .get_cached_transactions(wallet.id, TxStream::Normal)
        .map_err(|e| e.to_string())?;

    let mut positions = collect_positions(&wallet.address, &txs);
    let addresses: Vec<String> = positions.iter().map(|p| p.contract.clone()).collect();
    let label_map = labels::resolve_many(chain, &addresses).await;
    for position in &mut positions {
        position.label = label_map.get(&position.contract).cloned();
    }

    logger::debug(
        LogTag::LpStake,
        &format!(
            "Wallet {}: {} potential forgotten positions",
            wallet.id,
            positions.len()
        ),
    );

    let section = serde_json::json!({
        "count": positions.len(),
        "positions": positions,
    });
    db.upsert_report_section(wallet.id, "lp_stake", &section)
        .map_err(|e| format!("report write failed: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const POOL: &str = "0x4444444444444444444444444444444444444444";

    fn stake_tx(block: u64) -> serde_json::Value {
        // stake(uint256) selector 0xa694fc3a
        serde_json::json!({
            "from": WALLET,
            "to": POOL,
            "blockNumber": block.to_string(),
            "input": format!("0xa694fc3a{:0>64}", "de0b6b3a7640000"),
        })
    }

    #[test]
    fn test_distinct_contracts_with_latest_call() {
        let txs = vec![stake_tx(10), stake_tx(25)];
        let positions = collect_positions(WALLET, &txs);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].contract, POOL.to_lowercase());
        assert_eq!(positions[0].function, "stake(uint256)");
        assert_eq!(positions[0].last_seen_block, 25);
    }

    #[test]
    fn test_non_deposit_calls_are_ignored() {
        let transfer = serde_json::json!({
            "from": WALLET,
            "to": POOL,
            "blockNumber": "10",
            "input": format!("0xa9059cbb{}{}", "0".repeat(64), "0".repeat(64)),
        });
        assert!(collect_positions(WALLET, &[transfer]).is_empty());
    }

    #[test]
    fn test_incoming_transactions_are_ignored() {
        let mut tx = stake_tx(10);
        tx["from"] = serde_json::json!("0x9999999999999999999999999999999999999999");
        assert!(collect_positions(WALLET, &[tx]).is_empty());
    }
}
