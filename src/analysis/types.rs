/// Shared analysis domain types: finding severities, per-analyzer report
/// sections, and the structures serialized into the report's details slots.
use serde::{Deserialize, Serialize};

/// Finding severity, ordered so thresholds compare naturally
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Informational => "informational",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// APPROVALS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    Erc20,
    NftCollection,
    Permit,
    Permit2,
}

/// A confirmed standing approval surfaced to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalFinding {
    pub kind: ApprovalKind,
    /// Token or collection contract
    pub token: String,
    pub token_label: Option<String>,
    /// Spender or operator
    pub spender: String,
    pub spender_label: Option<String>,
    /// Human-formatted allowance (ERC-20 only)
    pub amount: Option<String>,
    pub is_unlimited: bool,
    /// Permit deadline (unix seconds), EIP-2612 only
    pub deadline: Option<u64>,
    pub severity: Severity,
    /// Pre-computed transaction data that revokes this approval
    pub revoke_calldata: String,
}

impl ApprovalFinding {
    /// Canonical lowercase fingerprint used for state diffing
    pub fn fingerprint(&self) -> String {
        let prefix = match self.kind {
            ApprovalKind::Erc20 => "erc20",
            ApprovalKind::NftCollection => "nft",
            ApprovalKind::Permit => "permit",
            ApprovalKind::Permit2 => "permit2",
        };
        format!(
            "{}-{}-{}",
            prefix,
            self.token.to_lowercase(),
            self.spender.to_lowercase()
        )
    }
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// Tiered keyword hits found in verified source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordHits {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
}

impl KeywordHits {
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.medium.is_empty() && self.low.is_empty()
    }
}

/// Honeypot heuristic flags computed from verified source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HoneypotFlags {
    /// `approve(` hidden inside an overridden transfer path (critical)
    pub hidden_approve: bool,
    /// Hardcoded sender blocklist inside a transfer path (high)
    pub hardcoded_block: bool,
    /// `string.concat(..., abi.encodePacked` obfuscation (medium)
    pub obfuscated_encoding: bool,
    /// SafeMath on a >= 0.8 pragma: suspicious cargo-culting (low)
    pub unnecessary_safemath: bool,
}

impl HoneypotFlags {
    pub fn any(&self) -> bool {
        self.hidden_approve
            || self.hardcoded_block
            || self.obfuscated_encoding
            || self.unnecessary_safemath
    }

    pub fn severity(&self) -> Option<Severity> {
        if self.hidden_approve {
            Some(Severity::Critical)
        } else if self.hardcoded_block {
            Some(Severity::High)
        } else if self.obfuscated_encoding {
            Some(Severity::Medium)
        } else if self.unnecessary_safemath {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

/// An unverified contract without risky selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnverifiedContract {
    pub address: String,
    pub label: Option<String>,
    /// "no bytecode" for self-destructed / EOA-looking addresses
    pub note: Option<String>,
}

/// An unverified contract whose bytecode carries risky selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnverifiedRiskyContract {
    pub address: String,
    pub label: Option<String>,
    /// Names of the matched selectors, e.g. "upgradeTo(address)"
    pub matched_selectors: Vec<String>,
    pub severity: Severity,
}

/// A verified contract with keyword or honeypot findings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedRiskyContract {
    pub address: String,
    pub contract_name: Option<String>,
    pub label: Option<String>,
    /// Implementation address when the analyzed contract sat behind a proxy
    pub implementation: Option<String>,
    pub keywords: KeywordHits,
    pub honeypot: HoneypotFlags,
    pub ai_summary: Option<String>,
    pub severity: Severity,
}

/// The contract analyzer's bucketed report section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractBuckets {
    pub unverified_contracts: Vec<UnverifiedContract>,
    pub unverified_with_risks: Vec<UnverifiedRiskyContract>,
    pub verified_contracts_with_risks: Vec<VerifiedRiskyContract>,
}

// =============================================================================
// ACTIVITY / LP-STAKE
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub transaction_count: u64,
    pub first_tx_at: Option<i64>,
    pub last_tx_at: Option<i64>,
    pub wallet_age_days: u64,
    pub unique_interacted_addresses: u64,
}

/// A contract that once received liquidity or stake from the wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialPosition {
    pub contract: String,
    pub label: Option<String>,
    /// The entrypoint that was called, e.g. "stake(uint256)"
    pub function: String,
    /// Block of the most recent deposit-like call
    pub last_seen_block: u64,
}
