/// Contract analyzer
///
/// For every distinct destination the wallet has touched: resolve EIP-1967
/// proxies to their implementation, scan verified source for risk keywords
/// and honeypot patterns (AI summary gated on meaningful hits), or scan raw
/// bytecode for risky selectors when no source is available. Assessments
/// are cached for 24 hours and shared with the on-demand analysis path.
use crate::adapter::{explorer, rpc};
use crate::analysis::honeypot;
use crate::analysis::selectors;
use crate::analysis::types::{
    ContractBuckets, HoneypotFlags, KeywordHits, Severity, UnverifiedContract,
    UnverifiedRiskyContract, VerifiedRiskyContract,
};
use crate::chains::Chain;
use crate::database::models::{StateSlot, TxStream, Wallet};
use crate::database::Database;
use crate::labels;
use crate::logger::{self, LogTag};
use crate::notifications::{self, FindingAlert, Notification, NotificationType};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Assessments older than this are recomputed
const ASSESSMENT_MAX_AGE_HOURS: i64 = 24;
/// Source excerpt passed to the AI summarizer
const AI_SOURCE_EXCERPT_CHARS: usize = 4_000;

/// One contract's full assessment; serialized into the 24-hour cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAssessment {
    pub address: String,
    pub verified: bool,
    pub no_bytecode: bool,
    pub contract_name: Option<String>,
    /// Set when the address is an EIP-1967 proxy
    pub implementation: Option<String>,
    pub matched_selectors: Vec<String>,
    pub selector_severity: Option<Severity>,
    pub keywords: KeywordHits,
    pub honeypot: HoneypotFlags,
    pub ai_summary: Option<String>,
}

impl ContractAssessment {
    fn clean(address: &str) -> Self {
        Self {
            address: address.to_lowercase(),
            verified: false,
            no_bytecode: false,
            contract_name: None,
            implementation: None,
            matched_selectors: Vec::new(),
            selector_severity: None,
            keywords: KeywordHits::default(),
            honeypot: HoneypotFlags::default(),
            ai_summary: None,
        }
    }

    /// Overall severity across keyword tiers, honeypot flags and selectors
    pub fn severity(&self) -> Option<Severity> {
        let keyword_severity = if !self.keywords.high.is_empty() {
            Some(Severity::High)
        } else if !self.keywords.medium.is_empty() {
            Some(Severity::Medium)
        } else if !self.keywords.low.is_empty() {
            Some(Severity::Low)
        } else {
            None
        };
        [
            self.honeypot.severity(),
            keyword_severity,
            self.selector_severity,
        ]
        .into_iter()
        .flatten()
        .max()
    }

    pub fn is_risky(&self) -> bool {
        self.severity().is_some()
    }
}

/// Assess a single contract address, resolving proxies first.
///
/// Explorer/gateway errors propagate; on-chain read failures degrade to
/// "unknown" per the adapter's contract.
pub async fn assess_contract(chain: Chain, address: &str) -> Result<ContractAssessment, String> {
    let Ok(parsed_address) = Address::from_str(address) else {
        return Err(format!("invalid contract address {}", address));
    };

    let mut assessment = ContractAssessment::clean(address);

    // Proxies are analyzed through their implementation
    let implementation = rpc::eip1967_implementation(chain, parsed_address).await;
    let target = implementation.unwrap_or(parsed_address);
    assessment.implementation = implementation.map(|a| a.to_string().to_lowercase());

    let source = explorer::get_contract_source(&target.to_string(), chain)
        .await
        .map_err(|e| format!("source fetch failed: {}", e))?;

    if let Some(source) = source {
        assessment.verified = true;
        assessment.contract_name = source.contract_name.clone();
        assessment.keywords = honeypot::scan_keywords(&source.source_code);
        assessment.honeypot = honeypot::scan_honeypot(&source.source_code);

        // AI summary only for contracts that actually tripped something
        // meaningful: HIGH/MEDIUM keywords or the hidden-approve heuristic
        let wants_summary = !assessment.keywords.high.is_empty()
            || !assessment.keywords.medium.is_empty()
            || assessment.honeypot.hidden_approve;
        if wants_summary {
            assessment.ai_summary =
                generate_summary(&assessment, &source.source_code).await;
        }
        return Ok(assessment);
    }

    // No verified source: fall back to bytecode selector scanning
    match rpc::get_code(chain, target).await {
        Some(bytecode) if bytecode.trim_start_matches("0x").is_empty() => {
            assessment.no_bytecode = true;
        }
        Some(bytecode) => {
            let matches = selectors::scan_bytecode(&bytecode);
            assessment.selector_severity = selectors::max_severity(&matches);
            assessment.matched_selectors =
                matches.iter().map(|m| m.name.to_string()).collect();
        }
        None => {
            // RPC unreachable: unknown, not risky
            assessment.no_bytecode = true;
        }
    }
    Ok(assessment)
}

async fn generate_summary(assessment: &ContractAssessment, source: &str) -> Option<String> {
    let excerpt: String = source.chars().take(AI_SOURCE_EXCERPT_CHARS).collect();
    let prompt = format!(
        "You are a smart contract security reviewer. In 2-3 sentences, explain \
         the practical risk to a wallet that interacted with this contract.\n\
         Contract: {}\n\
         Keyword hits: high={:?} medium={:?}\n\
         Hidden-approve heuristic: {}\n\
         Source excerpt:\n{}",
        assessment.contract_name.as_deref().unwrap_or("unknown"),
        assessment.keywords.high,
        assessment.keywords.medium,
        assessment.honeypot.hidden_approve,
        excerpt,
    );
    match explorer::generate_risk_summary(&prompt).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            // The assessment stands on its own; a missing summary is cosmetic
            logger::warning(LogTag::Contracts, &format!("AI summary failed: {}", e));
            None
        }
    }
}

/// Assess with the 24-hour cache in front
pub async fn assess_contract_cached(
    db: &Database,
    chain: Chain,
    address: &str,
) -> Result<ContractAssessment, String> {
    if let Ok(Some(cached)) =
        db.get_fresh_contract_analysis(address, chain.name(), ASSESSMENT_MAX_AGE_HOURS)
    {
        if let Ok(assessment) = serde_json::from_value(cached.analysis) {
            return Ok(assessment);
        }
    }

    let assessment = assess_contract(chain, address).await?;
    let json = serde_json::to_value(&assessment).map_err(|e| e.to_string())?;
    if let Err(e) = db.upsert_contract_analysis(address, chain.name(), &json) {
        logger::warning(
            LogTag::Contracts,
            &format!("Assessment cache write failed: {}", e),
        );
    }
    Ok(assessment)
}

/// Worker entrypoint
pub async fn run(db: &Database, wallet: &Wallet) -> Result<(), String> {
    let chain = Chain::parse(&wallet.chain)
        .ok_or_else(|| format!("unsupported chain {}", wallet.chain))?;
    let txs = db
        .get_cached_transactions(wallet.id, TxStream::Normal)
        .map_err(|e| e.to_string())?;

    let interacted = distinct_destinations(&wallet.address, &txs);
    logger::debug(
        LogTag::Contracts,
        &format!(
            "Wallet {}: {} distinct interacted addresses",
            wallet.id,
            interacted.len()
        ),
    );

    let mut buckets = ContractBuckets::default();
    for address in &interacted {
        // One bad contract must not sink the rest of the pass
        let assessment = match assess_contract_cached(db, chain, address).await {
            Ok(assessment) => assessment,
            Err(e) => {
                logger::warning(
                    LogTag::Contracts,
                    &format!("Assessment of {} failed: {}", address, e),
                );
                continue;
            }
        };
        bucket_assessment(&mut buckets, assessment);
    }

    // Decorate buckets with labels for display
    let addresses: Vec<String> = interacted.iter().cloned().collect();
    let label_map = labels::resolve_many(chain, &addresses).await;
    for entry in &mut buckets.unverified_contracts {
        entry.label = label_map.get(&entry.address).cloned();
    }
    for entry in &mut buckets.unverified_with_risks {
        entry.label = label_map.get(&entry.address).cloned();
    }
    for entry in &mut buckets.verified_contracts_with_risks {
        entry.label = label_map.get(&entry.address).cloned();
    }

    let alerts = build_alerts(&wallet.address, &buckets);
    let fingerprints: HashSet<String> = interacted.iter().cloned().collect();

    let section = serde_json::to_value(&buckets).map_err(|e| e.to_string())?;
    db.upsert_report_section(wallet.id, "contracts", &section)
        .map_err(|e| format!("report write failed: {}", e))?;

    let sent = notifications::diff_notify_and_store(
        db,
        wallet.id,
        StateSlot::Contracts,
        alerts,
        &fingerprints,
    )?;
    if sent > 0 {
        logger::info(
            LogTag::Contracts,
            &format!("Wallet {}: {} new contract alerts", wallet.id, sent),
        );
    }
    Ok(())
}

/// Distinct lowercased `to` addresses, excluding the wallet itself
pub fn distinct_destinations(wallet_address: &str, txs: &[serde_json::Value]) -> Vec<String> {
    let wallet_lower = wallet_address.to_lowercase();
    let mut seen = HashSet::new();
    let mut destinations = Vec::new();
    for tx in txs {
        let Some(to) = tx.get("to").and_then(|t| t.as_str()) else {
            continue;
        };
        let to = to.to_lowercase();
        if to.is_empty() || to == wallet_lower {
            continue;
        }
        if seen.insert(to.clone()) {
            destinations.push(to);
        }
    }
    destinations
}

fn bucket_assessment(buckets: &mut ContractBuckets, assessment: ContractAssessment) {
    if assessment.verified {
        if assessment.is_risky() {
            let severity = assessment.severity().unwrap_or(Severity::Low);
            buckets.verified_contracts_with_risks.push(VerifiedRiskyContract {
                address: assessment.address,
                contract_name: assessment.contract_name,
                label: None,
                implementation: assessment.implementation,
                keywords: assessment.keywords,
                honeypot: assessment.honeypot,
                ai_summary: assessment.ai_summary,
                severity,
            });
        }
        // Clean verified contracts stay out of the report
        return;
    }

    match assessment.selector_severity {
        // Any HIGH selector places the contract in the risky bucket
        Some(severity) if severity >= Severity::High => {
            buckets.unverified_with_risks.push(UnverifiedRiskyContract {
                address: assessment.address,
                label: None,
                matched_selectors: assessment.matched_selectors,
                severity,
            });
        }
        _ => {
            buckets.unverified_contracts.push(UnverifiedContract {
                address: assessment.address,
                label: None,
                note: if assessment.no_bytecode {
                    Some("no bytecode".to_string())
                } else if !assessment.matched_selectors.is_empty() {
                    Some(format!(
                        "low-risk selectors: {}",
                        assessment.matched_selectors.join(", ")
                    ))
                } else {
                    None
                },
            });
        }
    }
}

fn build_alerts(wallet_address: &str, buckets: &ContractBuckets) -> Vec<FindingAlert> {
    let mut alerts = Vec::new();

    for entry in &buckets.unverified_with_risks {
        alerts.push(FindingAlert {
            fingerprint: entry.address.clone(),
            severity: entry.severity,
            notification: Notification::new(NotificationType::RiskyContract {
                wallet: wallet_address.to_string(),
                contract: entry.address.clone(),
                label: entry.label.clone(),
                verified: false,
                reasons: entry.matched_selectors.clone(),
                severity: entry.severity,
            }),
        });
    }

    for entry in &buckets.verified_contracts_with_risks {
        let notification = if entry.honeypot.hidden_approve {
            // Honeypot findings get the dedicated critical alert even when
            // no high keyword matched
            Notification::new(NotificationType::HoneypotAlert {
                wallet: wallet_address.to_string(),
                contract: entry.address.clone(),
                label: entry.label.clone(),
                findings: honeypot_findings(&entry.honeypot),
            })
        } else {
            let mut reasons = entry.keywords.high.clone();
            reasons.extend(entry.keywords.medium.clone());
            Notification::new(NotificationType::RiskyContract {
                wallet: wallet_address.to_string(),
                contract: entry.address.clone(),
                label: entry.label.clone(),
                verified: true,
                reasons,
                severity: entry.severity,
            })
        };
        alerts.push(FindingAlert {
            fingerprint: entry.address.clone(),
            severity: entry.severity,
            notification,
        });
    }

    alerts
}

fn honeypot_findings(flags: &HoneypotFlags) -> Vec<String> {
    let mut findings = Vec::new();
    if flags.hidden_approve {
        findings.push("hidden approve in transfer override".to_string());
    }
    if flags.hardcoded_block {
        findings.push("hardcoded sender blocklist".to_string());
    }
    if flags.obfuscated_encoding {
        findings.push("obfuscated string encoding".to_string());
    }
    if flags.unnecessary_safemath {
        findings.push("SafeMath on >=0.8 pragma".to_string());
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_destinations_dedupe_and_skip_self() {
        let wallet = "0x1111111111111111111111111111111111111111";
        let txs = vec![
            serde_json::json!({"to": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}),
            serde_json::json!({"to": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"}),
            serde_json::json!({"to": wallet}),
            serde_json::json!({"to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"}),
            serde_json::json!({"hash": "0xcontract-creation-has-no-to"}),
        ];
        let destinations = distinct_destinations(wallet, &txs);
        assert_eq!(
            destinations,
            vec![
                "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
                "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            ]
        );
    }

    #[test]
    fn test_high_selector_lands_in_risky_bucket() {
        let mut buckets = ContractBuckets::default();
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.matched_selectors = vec!["upgradeTo(address)".to_string()];
        assessment.selector_severity = Some(Severity::High);
        bucket_assessment(&mut buckets, assessment);

        assert_eq!(buckets.unverified_with_risks.len(), 1);
        assert!(buckets.unverified_contracts.is_empty());
    }

    #[test]
    fn test_medium_selector_stays_in_plain_bucket() {
        let mut buckets = ContractBuckets::default();
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.matched_selectors = vec!["pause()".to_string()];
        assessment.selector_severity = Some(Severity::Medium);
        bucket_assessment(&mut buckets, assessment);

        assert!(buckets.unverified_with_risks.is_empty());
        assert_eq!(buckets.unverified_contracts.len(), 1);
    }

    #[test]
    fn test_no_bytecode_noted_without_risks() {
        let mut buckets = ContractBuckets::default();
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.no_bytecode = true;
        bucket_assessment(&mut buckets, assessment);

        assert_eq!(
            buckets.unverified_contracts[0].note.as_deref(),
            Some("no bytecode")
        );
    }

    #[test]
    fn test_clean_verified_contract_stays_out_of_report() {
        let mut buckets = ContractBuckets::default();
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.verified = true;
        bucket_assessment(&mut buckets, assessment);

        assert!(buckets.verified_contracts_with_risks.is_empty());
        assert!(buckets.unverified_contracts.is_empty());
    }

    #[test]
    fn test_honeypot_flag_outranks_keywords() {
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.verified = true;
        assessment.honeypot.hidden_approve = true;
        assessment.keywords.low = vec!["mint".to_string()];
        assert_eq!(assessment.severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_honeypot_alert_fires_without_high_keyword() {
        let mut buckets = ContractBuckets::default();
        let mut assessment = ContractAssessment::clean("0xabc");
        assessment.verified = true;
        assessment.honeypot.hidden_approve = true;
        bucket_assessment(&mut buckets, assessment);

        let alerts = build_alerts("0xwallet", &buckets);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert!(matches!(
            alerts[0].notification.notification_type,
            NotificationType::HoneypotAlert { .. }
        ));
    }
}
