/// Direct JSON-RPC reads (raw HTTP via reqwest)
///
/// These calls bypass the gateway: they hit the chain's public RPC
/// endpoint, carry no provider quota, and every failure is absorbed as
/// "unknown" so partial information never aborts an analyzer.
use crate::adapter::abi;
use crate::chains::Chain;
use crate::config::with_config;
use crate::logger::{self, LogTag};
use alloy::primitives::{Address, U256};
use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// EIP-1967 implementation slot
/// (`bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`)
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// Cap for cosmetic reads like `name()` and `decimals()`
const SHORT_READ_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

static RPC_CLIENT: Lazy<Client> = Lazy::new(Client::new);

async fn rpc_call(
    chain: Chain,
    method: &str,
    params: serde_json::Value,
    timeout: Duration,
) -> Option<String> {
    let url = with_config(|cfg| cfg.rpc_url(chain));
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = RPC_CLIENT
        .post(&url)
        .json(&body)
        .timeout(timeout)
        .send()
        .await;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            logger::debug(
                LogTag::Chain,
                &format!("{} {} failed: {}", chain, method, e),
            );
            return None;
        }
    };

    let parsed: serde_json::Value = match response.json().await {
        Ok(v) => v,
        Err(e) => {
            logger::debug(
                LogTag::Chain,
                &format!("{} {} returned invalid JSON: {}", chain, method, e),
            );
            return None;
        }
    };

    if let Some(error) = parsed.get("error") {
        logger::debug(
            LogTag::Chain,
            &format!("{} {} RPC error: {}", chain, method, error),
        );
        return None;
    }
    parsed
        .get("result")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
}

async fn eth_call(chain: Chain, to: Address, data: String, timeout: Duration) -> Option<String> {
    rpc_call(
        chain,
        "eth_call",
        serde_json::json!([{ "to": to.to_string(), "data": data }, "latest"]),
        timeout,
    )
    .await
}

// =============================================================================
// PUBLIC READS
// =============================================================================

/// Current ERC-20 allowance; read failures collapse to zero
pub async fn allowance(chain: Chain, token: Address, owner: Address, spender: Address) -> U256 {
    let data = abi::encode_allowance_call(owner, spender);
    match eth_call(chain, token, data, DEFAULT_TIMEOUT).await {
        Some(result) => abi::decode_uint_result(&result).unwrap_or(U256::ZERO),
        None => U256::ZERO,
    }
}

/// ERC-721/1155 operator approval; read failures collapse to false
pub async fn is_approved_for_all(
    chain: Chain,
    collection: Address,
    owner: Address,
    operator: Address,
) -> bool {
    let data = abi::encode_is_approved_for_all_call(owner, operator);
    match eth_call(chain, collection, data, DEFAULT_TIMEOUT).await {
        Some(result) => abi::decode_bool_result(&result).unwrap_or(false),
        None => false,
    }
}

/// On-chain `name()`, bounded to two seconds
pub async fn contract_name(chain: Chain, contract: Address) -> Option<String> {
    let data = format!("0x{}", hex::encode(abi::selector("name()")));
    let result = eth_call(chain, contract, data, SHORT_READ_TIMEOUT).await?;
    abi::decode_string_result(&result)
}

/// On-chain `decimals()`, bounded to two seconds; None when unreadable
pub async fn token_decimals(chain: Chain, token: Address) -> Option<u8> {
    let data = format!("0x{}", hex::encode(abi::selector("decimals()")));
    let result = eth_call(chain, token, data, SHORT_READ_TIMEOUT).await?;
    let value = abi::decode_uint_result(&result)?;
    u8::try_from(value).ok()
}

/// `balanceOf(owner)`; read failures collapse to zero
pub async fn balance_of(chain: Chain, token: Address, owner: Address) -> U256 {
    let data = abi::encode_balance_of_call(owner);
    match eth_call(chain, token, data, DEFAULT_TIMEOUT).await {
        Some(result) => abi::decode_uint_result(&result).unwrap_or(U256::ZERO),
        None => U256::ZERO,
    }
}

/// Raw deployed bytecode, hex-encoded with 0x prefix ("0x" = no code)
pub async fn get_code(chain: Chain, contract: Address) -> Option<String> {
    rpc_call(
        chain,
        "eth_getCode",
        serde_json::json!([contract.to_string(), "latest"]),
        DEFAULT_TIMEOUT,
    )
    .await
}

/// EIP-1967 implementation address behind a proxy, if the slot is set
pub async fn eip1967_implementation(chain: Chain, proxy: Address) -> Option<Address> {
    let result = rpc_call(
        chain,
        "eth_getStorageAt",
        serde_json::json!([proxy.to_string(), EIP1967_IMPLEMENTATION_SLOT, "latest"]),
        DEFAULT_TIMEOUT,
    )
    .await?;
    abi::decode_address_from_word(&result)
}
