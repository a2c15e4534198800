/// Explorer-backed operations, funneled through the gateway
///
/// Every call here becomes a persisted, rate-limited `api_requests` record;
/// the unified endpoint routes by the chain's numeric id.
use crate::chains::Chain;
use crate::database::models::TxStream;
use crate::errors::WardenError;
use crate::gateway::{self, ApiProvider, RequestData};

/// Sort direction for transaction listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Verified source code for a contract, when the explorer has it
#[derive(Debug, Clone)]
pub struct ContractSource {
    pub source_code: String,
    pub contract_name: Option<String>,
}

fn stream_action(stream: TxStream) -> &'static str {
    match stream {
        TxStream::Normal => "txlist",
        TxStream::Token => "tokentx",
        TxStream::Nft => "tokennfttx",
    }
}

/// List transactions for an address on one stream.
///
/// `start_block` bounds the scan from below (incremental fetches);
/// `page_size` caps the number of rows returned.
pub async fn list_transactions(
    address: &str,
    chain: Chain,
    stream: TxStream,
    start_block: Option<u64>,
    sort: SortOrder,
    page_size: u64,
) -> Result<Vec<serde_json::Value>, WardenError> {
    let mut params = vec![
        ("address".to_string(), address.to_lowercase()),
        ("sort".to_string(), sort.as_str().to_string()),
        ("page".to_string(), "1".to_string()),
        ("offset".to_string(), page_size.to_string()),
    ];
    if let Some(start_block) = start_block {
        params.push(("startblock".to_string(), start_block.to_string()));
        params.push(("endblock".to_string(), "latest".to_string()));
    }

    let result = gateway::submit(
        ApiProvider::Etherscan,
        RequestData::explorer("account", stream_action(stream), chain.id(), params),
    )
    .await?;

    let parsed: serde_json::Value = serde_json::from_str(&result)?;
    match parsed {
        serde_json::Value::Array(txs) => Ok(txs),
        // The gateway already normalizes the empty sentinel to []
        _ => Ok(Vec::new()),
    }
}

/// Fetch verified source code for a contract, if available.
/// An unverified contract yields Ok(None), not an error.
pub async fn get_contract_source(
    address: &str,
    chain: Chain,
) -> Result<Option<ContractSource>, WardenError> {
    let params = vec![("address".to_string(), address.to_lowercase())];
    let result = gateway::submit(
        ApiProvider::Etherscan,
        RequestData::explorer("contract", "getsourcecode", chain.id(), params),
    )
    .await?;

    let parsed: serde_json::Value = serde_json::from_str(&result)?;
    let entry = match parsed.as_array().and_then(|a| a.first()) {
        Some(entry) => entry,
        None => return Ok(None),
    };

    let source_code = entry
        .get("SourceCode")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();
    if source_code.trim().is_empty() {
        return Ok(None);
    }

    let contract_name = entry
        .get("ContractName")
        .and_then(|n| n.as_str())
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.to_string());

    Ok(Some(ContractSource {
        source_code,
        contract_name,
    }))
}

/// Ask the AI provider for a short risk summary of a contract source
pub async fn generate_risk_summary(prompt: &str) -> Result<String, WardenError> {
    gateway::submit(ApiProvider::Gemini, RequestData::generate(prompt)).await
}
