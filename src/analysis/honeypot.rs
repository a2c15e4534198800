/// Source-level risk scanning: tiered keyword matching and honeypot
/// heuristics over verified Solidity source.
///
/// All matching is case-insensitive over the raw source text. These are
/// heuristics, not a parser: the goal is to surface contracts worth a
/// closer look, not to prove malice.
use crate::analysis::types::{HoneypotFlags, KeywordHits};

const HIGH_KEYWORDS: &[&str] = &[
    "selfdestruct",
    "delegatecall",
    "callcode",
    "tx.origin",
    "ecrecover",
];
const MEDIUM_KEYWORDS: &[&str] = &["reentrancy", "assembly", "create2", "iszero"];
const LOW_KEYWORDS: &[&str] = &["shadows", "hidden", "onlyowner", "mint", "burn"];

/// Window after a transfer-function declaration inspected for a hidden
/// approve call
const HIDDEN_APPROVE_WINDOW: usize = 500;
/// Window after `string.concat(` inspected for `abi.encodePacked`
const OBFUSCATION_WINDOW: usize = 200;

/// Scan source for the tiered risk keyword lists
pub fn scan_keywords(source: &str) -> KeywordHits {
    let lowered = source.to_lowercase();
    let collect = |keywords: &[&str]| -> Vec<String> {
        keywords
            .iter()
            .filter(|kw| lowered.contains(&kw.to_lowercase()))
            .map(|kw| kw.to_string())
            .collect()
    };
    KeywordHits {
        high: collect(HIGH_KEYWORDS),
        medium: collect(MEDIUM_KEYWORDS),
        low: collect(LOW_KEYWORDS),
    }
}

/// Run all honeypot heuristics over the source
pub fn scan_honeypot(source: &str) -> HoneypotFlags {
    let lowered = source.to_lowercase();
    HoneypotFlags {
        hidden_approve: detect_hidden_approve(&lowered),
        hardcoded_block: detect_hardcoded_block(&lowered),
        obfuscated_encoding: detect_obfuscated_encoding(&lowered),
        unnecessary_safemath: detect_unnecessary_safemath(&lowered),
    }
}

/// `approve(` within ~500 chars after a declared override of
/// `_transfer` / `transferFrom` / `transfer`
fn detect_hidden_approve(lowered: &str) -> bool {
    for decl in ["function _transfer", "function transferfrom", "function transfer"] {
        for start in match_indices(lowered, decl) {
            let window_end = clamp_boundary(lowered, start + HIDDEN_APPROVE_WINDOW);
            let window = &lowered[start..window_end];
            if window.contains("override") && window.contains("approve(") {
                return true;
            }
        }
    }
    false
}

/// `require(sender != 0x<40 hex>`: a hardcoded sender blocklist
fn detect_hardcoded_block(lowered: &str) -> bool {
    for start in match_indices(lowered, "require(sender != 0x") {
        let hex_start = start + "require(sender != 0x".len();
        let hex_end = hex_start + 40;
        if hex_end <= lowered.len()
            && lowered[hex_start..hex_end]
                .chars()
                .all(|c| c.is_ascii_hexdigit())
        {
            return true;
        }
    }
    false
}

/// `string.concat(..., abi.encodePacked`: dynamic string assembly used to
/// hide literals from keyword scanners
fn detect_obfuscated_encoding(lowered: &str) -> bool {
    for start in match_indices(lowered, "string.concat(") {
        let window_end = clamp_boundary(lowered, start + OBFUSCATION_WINDOW);
        if lowered[start..window_end].contains("abi.encodepacked") {
            return true;
        }
    }
    false
}

/// `using SafeMath for uint256` under a >= 0.8 pragma: the library is
/// pointless there, so its presence is a suspicious signal
fn detect_unnecessary_safemath(lowered: &str) -> bool {
    if !lowered.contains("using safemath for uint256") {
        return false;
    }
    for start in match_indices(lowered, "pragma solidity") {
        let line_end = lowered[start..]
            .find(';')
            .map(|i| start + i)
            .unwrap_or(lowered.len());
        let pragma = &lowered[start..line_end];
        if pragma.contains("0.8") {
            return true;
        }
    }
    false
}

fn match_indices(haystack: &str, needle: &str) -> Vec<usize> {
    haystack.match_indices(needle).map(|(i, _)| i).collect()
}

/// Clamp a byte offset down to the nearest char boundary so windowed
/// slicing never panics on multibyte characters in comments
fn clamp_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_tiered_and_case_insensitive() {
        let source = "contract X { function f() { SELFDESTRUCT(payable(owner)); } \
                      modifier onlyOwner() { _; } }";
        let hits = scan_keywords(source);
        assert_eq!(hits.high, vec!["selfdestruct"]);
        assert!(hits.medium.is_empty());
        assert_eq!(hits.low, vec!["onlyowner"]);
    }

    #[test]
    fn test_hidden_approve_inside_overridden_transfer() {
        let source = r#"
            function _transfer(address from, address to, uint256 amount)
                internal virtual override
            {
                super._transfer(from, to, amount);
                _approve(from, attacker, type(uint256).max);
            }
        "#;
        assert!(scan_honeypot(source).hidden_approve);
    }

    #[test]
    fn test_approve_without_override_is_clean() {
        let source = r#"
            function _transfer(address from, address to, uint256 amount) internal {
                balances[from] -= amount;
            }
            function approve(address spender, uint256 amount) public returns (bool) {
                return _approve(msg.sender, spender, amount);
            }
        "#;
        assert!(!scan_honeypot(source).hidden_approve);
    }

    #[test]
    fn test_hardcoded_block_requires_full_address() {
        let blocked = format!("require(sender != 0x{}, \"blocked\");", "ab".repeat(20));
        assert!(scan_honeypot(&blocked).hardcoded_block);

        // Too-short hex literal is not an address comparison
        assert!(!scan_honeypot("require(sender != 0xdead);").hardcoded_block);
    }

    #[test]
    fn test_obfuscated_encoding_pattern() {
        let source = r#"string.concat("pre", string(abi.encodePacked(secret)))"#;
        assert!(scan_honeypot(source).obfuscated_encoding);
        assert!(!scan_honeypot("string.concat(a, b)").obfuscated_encoding);
    }

    #[test]
    fn test_safemath_only_suspicious_on_modern_pragma() {
        let modern = "pragma solidity ^0.8.19;\nusing SafeMath for uint256;";
        assert!(scan_honeypot(modern).unnecessary_safemath);

        let legacy = "pragma solidity ^0.6.12;\nusing SafeMath for uint256;";
        assert!(!scan_honeypot(legacy).unnecessary_safemath);
    }
}
