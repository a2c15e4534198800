/// Risky function selectors scanned for in unverified bytecode.
///
/// The 4-byte values are wire-protocol constants: they are searched as hex
/// substrings of the deployed bytecode, so presence means the contract
/// dispatches (or at least embeds) the selector.
use crate::analysis::types::Severity;

#[derive(Debug, Clone, Copy)]
pub struct RiskySelector {
    /// Canonical signature the selector belongs to
    pub name: &'static str,
    /// Lowercase hex, no 0x prefix
    pub selector_hex: &'static str,
    pub severity: Severity,
}

pub const RISKY_SELECTORS: &[RiskySelector] = &[
    // HIGH: upgrade/ownership/self-destruction escape hatches
    RiskySelector {
        name: "delegatecall(bytes)",
        selector_hex: "592ac5a6",
        severity: Severity::High,
    },
    RiskySelector {
        name: "upgradeTo(address)",
        selector_hex: "3659cfe6",
        severity: Severity::High,
    },
    RiskySelector {
        name: "upgradeToAndCall(address,bytes)",
        selector_hex: "4f1ef286",
        severity: Severity::High,
    },
    RiskySelector {
        name: "setOwner(address)",
        selector_hex: "13af4035",
        severity: Severity::High,
    },
    RiskySelector {
        name: "kill()",
        selector_hex: "c01a7570",
        severity: Severity::High,
    },
    RiskySelector {
        name: "destroy()",
        selector_hex: "83197ef0",
        severity: Severity::High,
    },
    RiskySelector {
        name: "rug()",
        selector_hex: "93252358",
        severity: Severity::High,
    },
    RiskySelector {
        name: "exit()",
        selector_hex: "e9b28907",
        severity: Severity::High,
    },
    // MEDIUM: supply and access controls worth knowing about
    RiskySelector {
        name: "mint(address,uint256)",
        selector_hex: "40c10f19",
        severity: Severity::Medium,
    },
    RiskySelector {
        name: "pause()",
        selector_hex: "8456cb59",
        severity: Severity::Medium,
    },
    RiskySelector {
        name: "blacklist(address)",
        selector_hex: "f9f92be4",
        severity: Severity::Medium,
    },
    RiskySelector {
        name: "setFee(uint256)",
        selector_hex: "69fe0e2d",
        severity: Severity::Medium,
    },
    // LOW: common ownership plumbing
    RiskySelector {
        name: "transferOwnership(address)",
        selector_hex: "f2fde38b",
        severity: Severity::Low,
    },
    RiskySelector {
        name: "renounceOwnership()",
        selector_hex: "715018a6",
        severity: Severity::Low,
    },
];

/// Scan hex-encoded bytecode for risky selectors; returns matches with the
/// highest severity first
pub fn scan_bytecode(bytecode_hex: &str) -> Vec<RiskySelector> {
    let lowered = bytecode_hex.trim_start_matches("0x").to_lowercase();
    if lowered.is_empty() {
        return Vec::new();
    }
    let mut matches: Vec<RiskySelector> = RISKY_SELECTORS
        .iter()
        .filter(|s| lowered.contains(s.selector_hex))
        .copied()
        .collect();
    matches.sort_by(|a, b| b.severity.cmp(&a.severity));
    matches
}

/// Highest severity among matches, if any
pub fn max_severity(matches: &[RiskySelector]) -> Option<Severity> {
    matches.first().map(|m| m.severity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_selector_detected() {
        // Selector embedded in a dispatch table
        let bytecode = format!("0x6080604052{}565b", "3659cfe6");
        let matches = scan_bytecode(&bytecode);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "upgradeTo(address)");
        assert_eq!(max_severity(&matches), Some(Severity::High));
    }

    #[test]
    fn test_matches_sorted_by_severity() {
        let bytecode = format!("0x{}{}{}", "715018a6", "40c10f19", "83197ef0");
        let matches = scan_bytecode(&bytecode);
        assert_eq!(matches[0].severity, Severity::High);
        assert_eq!(matches.last().unwrap().severity, Severity::Low);
    }

    #[test]
    fn test_empty_bytecode_has_no_matches() {
        assert!(scan_bytecode("0x").is_empty());
        assert!(scan_bytecode("").is_empty());
    }
}
