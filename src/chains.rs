/// Supported EVM chains and their wire identifiers.
///
/// The numeric ids are part of the explorer wire protocol (`chainid=` query
/// parameter) and must match exactly.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Arbitrum,
    Base,
    Zksync,
}

impl Chain {
    /// All supported chains, in scan order
    pub fn all() -> [Chain; 5] {
        [
            Chain::Ethereum,
            Chain::Polygon,
            Chain::Arbitrum,
            Chain::Base,
            Chain::Zksync,
        ]
    }

    /// Numeric chain id used by the unified explorer endpoint
    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Polygon => 137,
            Chain::Arbitrum => 42161,
            Chain::Base => 8453,
            Chain::Zksync => 324,
        }
    }

    /// Canonical lowercase name (stored in the database)
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Base => "base",
            Chain::Zksync => "zksync",
        }
    }

    /// Environment variable holding this chain's JSON-RPC endpoint
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETHEREUM_RPC_URL",
            Chain::Polygon => "POLYGON_RPC_URL",
            Chain::Arbitrum => "ARBITRUM_RPC_URL",
            Chain::Base => "BASE_RPC_URL",
            Chain::Zksync => "ZKSYNC_RPC_URL",
        }
    }

    /// Default public RPC endpoint, used when no env override is present
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://eth.llamarpc.com",
            Chain::Polygon => "https://polygon-rpc.com",
            Chain::Arbitrum => "https://arb1.arbitrum.io/rpc",
            Chain::Base => "https://mainnet.base.org",
            Chain::Zksync => "https://mainnet.era.zksync.io",
        }
    }

    /// Parse from the canonical name
    pub fn parse(s: &str) -> Option<Chain> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "polygon" | "matic" => Some(Chain::Polygon),
            "arbitrum" => Some(Chain::Arbitrum),
            "base" => Some(Chain::Base),
            "zksync" => Some(Chain::Zksync),
            _ => None,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ids_match_wire_protocol() {
        assert_eq!(Chain::Ethereum.id(), 1);
        assert_eq!(Chain::Polygon.id(), 137);
        assert_eq!(Chain::Arbitrum.id(), 42161);
        assert_eq!(Chain::Base.id(), 8453);
        assert_eq!(Chain::Zksync.id(), 324);
    }

    #[test]
    fn test_parse_round_trip() {
        for chain in Chain::all() {
            assert_eq!(Chain::parse(chain.name()), Some(chain));
        }
        assert_eq!(Chain::parse("dogecoin"), None);
    }
}
