/// Approval analyzer
///
/// Reconstructs the wallet's standing approvals from cached transaction
/// calldata (last-writer-wins per `(token, spender)` pair), confirms each
/// surviving intent on-chain, decorates with labels, and emits stateful
/// alerts for newly-seen risky approvals.
use crate::adapter::{abi, rpc};
use crate::analysis::signatures::APPROVAL_SIGNATURES;
use crate::analysis::types::{ApprovalFinding, ApprovalKind, Severity};
use crate::chains::Chain;
use crate::database::models::{StateSlot, TxStream, Wallet};
use crate::database::Database;
use crate::labels;
use crate::logger::{self, LogTag};
use crate::notifications::{self, FindingAlert, Notification, NotificationType};
use alloy::primitives::{Address, U256};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Permit deadlines beyond one year count as long-lived
const LONG_LIVED_PERMIT_SECS: u64 = 365 * 24 * 60 * 60;

/// A reconstructed approval intent, pre-confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalIntent {
    pub kind: ApprovalKind,
    /// Contract the call went to (token / collection / Permit2)
    pub token: Address,
    pub spender: Address,
    pub value: U256,
    pub deadline: Option<u64>,
    pub block: u64,
}

/// Replay approval calldata from the wallet's outgoing transactions and
/// keep the latest intent per `(kind-group, token, spender)` pair.
///
/// `setApprovalForAll(op, false)` and `approve(s, 0)` erase their pair.
pub fn collect_intents(wallet_address: &str, txs: &[serde_json::Value]) -> Vec<ApprovalIntent> {
    let wallet_lower = wallet_address.to_lowercase();
    // Keyed by (erc20/nft discriminator, token, spender); iteration order of
    // txs is block-ascending, so inserts naturally overwrite older intents
    let mut intents: HashMap<(u8, Address, Address), ApprovalIntent> = HashMap::new();

    for tx in txs {
        let from = tx.get("from").and_then(|f| f.as_str()).unwrap_or("");
        if from.to_lowercase() != wallet_lower {
            continue;
        }
        let Some(to) = tx
            .get("to")
            .and_then(|t| t.as_str())
            .and_then(|t| Address::from_str(t).ok())
        else {
            continue;
        };
        let input = tx.get("input").and_then(|i| i.as_str()).unwrap_or("");
        let Some(parsed) = abi::parse_input(input, &APPROVAL_SIGNATURES) else {
            continue;
        };
        let block = tx
            .get("blockNumber")
            .and_then(|b| b.as_str())
            .and_then(|b| b.parse::<u64>().ok())
            .unwrap_or(0);

        match parsed.name.as_str() {
            "approve" => {
                let (Some(spender), Some(value)) = (
                    parsed.args[0].as_address(),
                    parsed.args[1].as_uint(),
                ) else {
                    continue;
                };
                let key = (0u8, to, spender);
                if value.is_zero() {
                    // An explicit revoke erases the pair
                    intents.remove(&key);
                } else {
                    intents.insert(
                        key,
                        ApprovalIntent {
                            kind: ApprovalKind::Erc20,
                            token: to,
                            spender,
                            value,
                            deadline: None,
                            block,
                        },
                    );
                }
            }
            "setApprovalForAll" => {
                let (Some(operator), Some(approved)) = (
                    parsed.args[0].as_address(),
                    parsed.args[1].as_bool(),
                ) else {
                    continue;
                };
                let key = (1u8, to, operator);
                if approved {
                    intents.insert(
                        key,
                        ApprovalIntent {
                            kind: ApprovalKind::NftCollection,
                            token: to,
                            spender: operator,
                            value: U256::ZERO,
                            deadline: None,
                            block,
                        },
                    );
                } else {
                    intents.remove(&key);
                }
            }
            "permit" => {
                // permit(owner, spender, value, deadline, v, r, s)
                let (Some(spender), Some(value), Some(deadline)) = (
                    parsed.args[1].as_address(),
                    parsed.args[2].as_uint(),
                    parsed.args[3].as_uint(),
                ) else {
                    continue;
                };
                intents.insert(
                    (0u8, to, spender),
                    ApprovalIntent {
                        kind: ApprovalKind::Permit,
                        token: to,
                        spender,
                        value,
                        deadline: deadline.try_into().ok(),
                        block,
                    },
                );
            }
            // Permit2 entrypoints: a standing approval authority was used
            "permitTransferFrom" | "permitWitnessTransferFrom" => {
                intents.insert(
                    (2u8, to, to),
                    ApprovalIntent {
                        kind: ApprovalKind::Permit2,
                        token: to,
                        spender: to,
                        value: U256::ZERO,
                        deadline: None,
                        block,
                    },
                );
            }
            _ => {}
        }
    }

    let mut surviving: Vec<ApprovalIntent> = intents.into_values().collect();
    surviving.sort_by_key(|i| (i.token, i.spender, i.block));
    surviving
}

/// Confirm surviving intents on-chain and build the displayable findings
pub async fn confirm_intents(
    chain: Chain,
    wallet_address: &str,
    intents: Vec<ApprovalIntent>,
) -> Vec<ApprovalFinding> {
    let Ok(owner) = Address::from_str(wallet_address) else {
        return Vec::new();
    };
    let now = Utc::now().timestamp() as u64;
    let mut findings = Vec::new();

    for intent in intents {
        match intent.kind {
            ApprovalKind::Erc20 => {
                let allowance = rpc::allowance(chain, intent.token, owner, intent.spender).await;
                if allowance.is_zero() {
                    continue;
                }
                let is_unlimited = allowance == U256::MAX;
                let amount = if is_unlimited {
                    "unlimited".to_string()
                } else {
                    let decimals = rpc::token_decimals(chain, intent.token).await.unwrap_or(18);
                    format_token_amount(allowance, decimals)
                };
                findings.push(ApprovalFinding {
                    kind: ApprovalKind::Erc20,
                    token: intent.token.to_string().to_lowercase(),
                    token_label: None,
                    spender: intent.spender.to_string().to_lowercase(),
                    spender_label: None,
                    amount: Some(amount),
                    is_unlimited,
                    deadline: None,
                    severity: if is_unlimited {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    revoke_calldata: abi::encode_erc20_revoke(intent.spender),
                });
            }
            ApprovalKind::NftCollection => {
                if !rpc::is_approved_for_all(chain, intent.token, owner, intent.spender).await {
                    continue;
                }
                findings.push(ApprovalFinding {
                    kind: ApprovalKind::NftCollection,
                    token: intent.token.to_string().to_lowercase(),
                    token_label: None,
                    spender: intent.spender.to_string().to_lowercase(),
                    spender_label: None,
                    amount: None,
                    is_unlimited: true,
                    deadline: None,
                    severity: Severity::High,
                    revoke_calldata: abi::encode_nft_revoke(intent.spender),
                });
            }
            ApprovalKind::Permit => {
                // Only far-future deadlines are worth surfacing
                let Some(deadline) = intent.deadline else {
                    continue;
                };
                if deadline <= now.saturating_add(LONG_LIVED_PERMIT_SECS) {
                    continue;
                }
                findings.push(ApprovalFinding {
                    kind: ApprovalKind::Permit,
                    token: intent.token.to_string().to_lowercase(),
                    token_label: None,
                    spender: intent.spender.to_string().to_lowercase(),
                    spender_label: None,
                    amount: None,
                    is_unlimited: intent.value == U256::MAX,
                    deadline: Some(deadline),
                    severity: Severity::Medium,
                    revoke_calldata: abi::encode_erc20_revoke(intent.spender),
                });
            }
            ApprovalKind::Permit2 => {
                findings.push(ApprovalFinding {
                    kind: ApprovalKind::Permit2,
                    token: intent.token.to_string().to_lowercase(),
                    token_label: None,
                    spender: intent.spender.to_string().to_lowercase(),
                    spender_label: None,
                    amount: None,
                    is_unlimited: false,
                    deadline: None,
                    severity: Severity::Informational,
                    revoke_calldata: abi::encode_erc20_revoke(intent.spender),
                });
            }
        }
    }
    findings
}

/// Worker entrypoint
pub async fn run(db: &Database, wallet: &Wallet) -> Result<(), String> {
    let chain = Chain::parse(&wallet.chain)
        .ok_or_else(|| format!("unsupported chain {}", wallet.chain))?;
    let txs = db
        .get_cached_transactions(wallet.id, TxStream::Normal)
        .map_err(|e| e.to_string())?;

    let intents = collect_intents(&wallet.address, &txs);
    logger::debug(
        LogTag::Approvals,
        &format!(
            "Wallet {}: {} surviving approval intents",
            wallet.id,
            intents.len()
        ),
    );

    let mut findings = confirm_intents(chain, &wallet.address, intents).await;

    // Decorate with display labels
    let addresses: Vec<String> = findings
        .iter()
        .flat_map(|f| [f.token.clone(), f.spender.clone()])
        .collect();
    let label_map = labels::resolve_many(chain, &addresses).await;
    for finding in &mut findings {
        finding.token_label = label_map.get(&finding.token).cloned();
        finding.spender_label = label_map.get(&finding.spender).cloned();
    }

    let fingerprints: HashSet<String> = findings.iter().map(|f| f.fingerprint()).collect();
    let alerts = build_alerts(&wallet.address, &findings);

    let section = serde_json::json!({
        "count": findings.len(),
        "items": findings,
    });
    db.upsert_report_section(wallet.id, "approvals", &section)
        .map_err(|e| format!("report write failed: {}", e))?;

    let sent =
        notifications::diff_notify_and_store(db, wallet.id, StateSlot::Approvals, alerts, &fingerprints)?;
    if sent > 0 {
        logger::info(
            LogTag::Approvals,
            &format!("Wallet {}: {} new approval alerts", wallet.id, sent),
        );
    }
    Ok(())
}

fn build_alerts(wallet_address: &str, findings: &[ApprovalFinding]) -> Vec<FindingAlert> {
    findings
        .iter()
        .map(|finding| {
            let notification_type = match finding.kind {
                ApprovalKind::Erc20 if finding.is_unlimited => {
                    NotificationType::UnlimitedApproval {
                        wallet: wallet_address.to_string(),
                        token: finding.token.clone(),
                        token_label: finding.token_label.clone(),
                        spender: finding.spender.clone(),
                        spender_label: finding.spender_label.clone(),
                    }
                }
                ApprovalKind::Erc20 => NotificationType::TokenApproval {
                    wallet: wallet_address.to_string(),
                    token: finding.token.clone(),
                    token_label: finding.token_label.clone(),
                    spender: finding.spender.clone(),
                    spender_label: finding.spender_label.clone(),
                    amount: finding.amount.clone().unwrap_or_default(),
                },
                ApprovalKind::NftCollection => NotificationType::NftApproval {
                    wallet: wallet_address.to_string(),
                    collection: finding.token.clone(),
                    collection_label: finding.token_label.clone(),
                    operator: finding.spender.clone(),
                    operator_label: finding.spender_label.clone(),
                },
                ApprovalKind::Permit | ApprovalKind::Permit2 => {
                    NotificationType::LongLivedPermit {
                        wallet: wallet_address.to_string(),
                        token: finding.token.clone(),
                        token_label: finding.token_label.clone(),
                        spender: finding.spender.clone(),
                        deadline: finding.deadline.unwrap_or(0),
                    }
                }
            };
            FindingAlert {
                fingerprint: finding.fingerprint(),
                severity: finding.severity,
                notification: Notification::new(notification_type),
            }
        })
        .collect()
}

/// Human-format a raw token amount with up to four fractional digits
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    let scale = U256::from(10).pow(U256::from(decimals as u64));
    if scale.is_zero() {
        return value.to_string();
    }
    let whole = value / scale;
    let remainder = value % scale;
    if remainder.is_zero() {
        return whole.to_string();
    }
    // Four digits of the fractional part, trailing zeros trimmed
    let frac_scale = U256::from(10_000u64);
    let frac = (remainder * frac_scale) / scale;
    let frac_str = format!("{:04}", frac.to::<u64>());
    let trimmed = frac_str.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const TOKEN: &str = "0x2222222222222222222222222222222222222222";
    const SPENDER: &str = "0x3333333333333333333333333333333333333333";

    fn word_for_address(address: &str) -> String {
        format!("{:0>64}", address.trim_start_matches("0x"))
    }

    fn approve_tx(block: u64, value_hex64: &str) -> serde_json::Value {
        serde_json::json!({
            "from": WALLET,
            "to": TOKEN,
            "blockNumber": block.to_string(),
            "input": format!("0x095ea7b3{}{}", word_for_address(SPENDER), value_hex64),
        })
    }

    fn set_approval_tx(block: u64, approved: bool) -> serde_json::Value {
        let flag = if approved { "1" } else { "0" };
        serde_json::json!({
            "from": WALLET,
            "to": TOKEN,
            "blockNumber": block.to_string(),
            "input": format!(
                "0xa22cb465{}{:0>64}",
                word_for_address(SPENDER),
                flag
            ),
        })
    }

    #[test]
    fn test_last_writer_wins_per_pair() {
        let txs = vec![
            approve_tx(10, &"f".repeat(64)),
            approve_tx(20, &format!("{:0>64}", "64")), // 0x64 = 100
        ];
        let intents = collect_intents(WALLET, &txs);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].value, U256::from(0x64));
        assert_eq!(intents[0].block, 20);
    }

    #[test]
    fn test_approve_zero_erases_the_pair() {
        let txs = vec![approve_tx(10, &"f".repeat(64)), approve_tx(20, &"0".repeat(64))];
        assert!(collect_intents(WALLET, &txs).is_empty());
    }

    #[test]
    fn test_set_approval_for_all_false_erases_pair() {
        let txs = vec![set_approval_tx(10, true), set_approval_tx(20, false)];
        assert!(collect_intents(WALLET, &txs).is_empty());

        // In the other order the approval survives
        let txs = vec![set_approval_tx(10, false), set_approval_tx(20, true)];
        let intents = collect_intents(WALLET, &txs);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].kind, ApprovalKind::NftCollection);
    }

    #[test]
    fn test_other_wallets_transactions_are_ignored() {
        let mut tx = approve_tx(10, &"f".repeat(64));
        tx["from"] = serde_json::json!("0x9999999999999999999999999999999999999999");
        assert!(collect_intents(WALLET, &[tx]).is_empty());
    }

    #[test]
    fn test_revoke_calldata_round_trip_clears_approval() {
        // approve(spender, MAX) then replaying the revoke calldata as the
        // next intent source leaves nothing surfaced
        let unlimited = approve_tx(10, &"f".repeat(64));
        let intents = collect_intents(WALLET, &[unlimited.clone()]);
        assert_eq!(intents.len(), 1);

        let revoke = abi::encode_erc20_revoke(Address::from_str(SPENDER).unwrap());
        let revoke_tx = serde_json::json!({
            "from": WALLET,
            "to": TOKEN,
            "blockNumber": "11",
            "input": revoke,
        });
        assert!(collect_intents(WALLET, &[unlimited, revoke_tx]).is_empty());
    }

    #[test]
    fn test_erc20_and_nft_pairs_do_not_collide() {
        // Same (token, spender) in both families must coexist
        let txs = vec![approve_tx(10, &"f".repeat(64)), set_approval_tx(11, true)];
        let intents = collect_intents(WALLET, &txs);
        assert_eq!(intents.len(), 2);
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(
            format_token_amount(U256::from(1_500_000_000_000_000_000u64), 18),
            "1.5"
        );
        assert_eq!(format_token_amount(U256::from(2_000_000u64), 6), "2");
        assert_eq!(format_token_amount(U256::from(123u64), 0), "123");
        assert_eq!(format_token_amount(U256::from(500u64), 6), "0.0005");
    }

    #[test]
    fn test_fingerprints_are_lowercase_and_stable() {
        let finding = ApprovalFinding {
            kind: ApprovalKind::Erc20,
            token: TOKEN.to_string(),
            token_label: None,
            spender: SPENDER.to_string(),
            spender_label: None,
            amount: None,
            is_unlimited: true,
            deadline: None,
            severity: Severity::High,
            revoke_calldata: String::new(),
        };
        assert_eq!(
            finding.fingerprint(),
            format!("erc20-{}-{}", TOKEN, SPENDER)
        );
    }
}
