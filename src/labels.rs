//! Label service: address → human-readable name
//!
//! Resolution layers, cheapest first: process memo → persistent label
//! store → on-chain `name()` (2 s cap) → explorer source metadata
//! (`ContractName`). Proxy-looking names trigger one re-lookup through the
//! EIP-1967 implementation. New findings are persisted best-effort; the
//! memo caches misses too so unknown addresses are not re-queried every
//! scan.
use crate::adapter::{explorer, rpc};
use crate::chains::Chain;
use crate::database;
use crate::logger::{self, LogTag};
use alloy::primitives::Address;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

/// Process-wide memo keyed by (chain, lowercase address)
static LABEL_MEMO: Lazy<Mutex<HashMap<(String, String), Option<String>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Resolve one address to a display label, if any layer knows it
pub async fn resolve(chain: Chain, address: &str) -> Option<String> {
    let key = (chain.name().to_string(), address.to_lowercase());

    if let Some(cached) = LABEL_MEMO.lock().unwrap().get(&key) {
        return cached.clone();
    }

    let resolved = resolve_uncached(chain, &key.1).await;
    LABEL_MEMO
        .lock()
        .unwrap()
        .insert(key, resolved.clone());
    resolved
}

/// Resolve a batch; unknowns are left out of the returned map
pub async fn resolve_many(chain: Chain, addresses: &[String]) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for address in addresses {
        let address = address.to_lowercase();
        if labels.contains_key(&address) {
            continue;
        }
        if let Some(label) = resolve(chain, &address).await {
            labels.insert(address, label);
        }
    }
    labels
}

async fn resolve_uncached(chain: Chain, address_lower: &str) -> Option<String> {
    // Persistent store
    if let Ok(db) = database::get_database() {
        if let Ok(Some(record)) = db.get_address_label(address_lower, chain.name()) {
            return Some(record.label);
        }
    }

    let parsed = Address::from_str(address_lower).ok()?;

    // On-chain name()
    if let Some(name) = rpc::contract_name(chain, parsed).await {
        persist(chain, address_lower, &name, "onchain");
        return Some(name);
    }

    // Explorer source metadata
    let name = match explorer::get_contract_source(address_lower, chain).await {
        Ok(Some(source)) => source.contract_name,
        _ => None,
    }?;

    // A proxy's own name is rarely what the user wants to see; prefer the
    // implementation's name when it differs
    let name = if name.to_lowercase().contains("proxy") {
        match rpc::eip1967_implementation(chain, parsed).await {
            Some(implementation) => {
                let implementation_name =
                    match explorer::get_contract_source(&implementation.to_string(), chain).await {
                        Ok(Some(source)) => source.contract_name,
                        _ => None,
                    };
                match implementation_name {
                    Some(implementation_name) if implementation_name != name => implementation_name,
                    _ => name,
                }
            }
            None => name,
        }
    } else {
        name
    };

    persist(chain, address_lower, &name, "explorer");
    Some(name)
}

/// Best-effort persistence; unique-constraint races are ignored inside the
/// store and anything else just logs
fn persist(chain: Chain, address: &str, label: &str, source: &str) {
    let Ok(db) = database::get_database() else {
        return;
    };
    if let Err(e) = db.save_address_label(address, chain.name(), label, source) {
        logger::debug(
            LogTag::Labels,
            &format!("Label persist for {} failed: {}", address, e),
        );
    }
}

/// Tests seed the memo directly to avoid network lookups
#[cfg(test)]
pub fn memoize_for_tests(chain: Chain, address: &str, label: Option<String>) {
    LABEL_MEMO
        .lock()
        .unwrap()
        .insert((chain.name().to_string(), address.to_lowercase()), label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memo_short_circuits_resolution() {
        memoize_for_tests(Chain::Ethereum, "0xABCDEF", Some("Uniswap Router".to_string()));
        // Uppercase input hits the same memo entry
        let label = resolve(Chain::Ethereum, "0xABCDEF").await;
        assert_eq!(label.as_deref(), Some("Uniswap Router"));
    }

    #[tokio::test]
    async fn test_resolve_many_skips_unknowns() {
        memoize_for_tests(Chain::Polygon, "0xaa01", Some("Known".to_string()));
        memoize_for_tests(Chain::Polygon, "0xaa02", None);
        let labels = resolve_many(
            Chain::Polygon,
            &["0xaa01".to_string(), "0xaa02".to_string()],
        )
        .await;
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("0xaa01").map(|s| s.as_str()), Some("Known"));
    }
}
