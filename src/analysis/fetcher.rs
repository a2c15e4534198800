/// Transaction fetcher: keeps the per-wallet cache incremental.
///
/// Each stream (normal / token / NFT) has its own watermark. A watermark of
/// zero means the wallet has never been scanned: the initial scan runs
/// newest-first and is capped; afterwards fetches run oldest-first from
/// `watermark + 1`. A failing stream records its error into the report and
/// never blocks the other streams.
use crate::adapter::explorer::{self, SortOrder};
use crate::chains::Chain;
use crate::config::with_config;
use crate::database::models::{TaskType, TxStream, Wallet};
use crate::database::Database;
use crate::logger::{self, LogTag};
use std::collections::BTreeMap;

/// Per-stream fetch outcome recorded into the report's `fetch` section
#[derive(Debug, serde::Serialize)]
struct StreamOutcome {
    fetched: usize,
    watermark: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(db: &Database, wallet: &Wallet) -> Result<(), String> {
    let chain = Chain::parse(&wallet.chain)
        .ok_or_else(|| format!("wallet {} has unsupported chain {}", wallet.id, wallet.chain))?;
    let initial_cap = with_config(|cfg| cfg.scanner.initial_scan_max_tx);

    let mut outcomes: BTreeMap<&'static str, StreamOutcome> = BTreeMap::new();
    for stream in TxStream::all() {
        let outcome = fetch_stream(db, wallet, chain, stream, initial_cap).await;
        let outcome = match outcome {
            Ok(fetched) => StreamOutcome {
                fetched,
                watermark: db.get_watermark(wallet.id, stream).unwrap_or(0),
                error: None,
            },
            Err(e) => {
                logger::warning(
                    LogTag::Fetcher,
                    &format!(
                        "Stream {} for wallet {} failed: {}",
                        stream.as_str(),
                        wallet.id,
                        e
                    ),
                );
                StreamOutcome {
                    fetched: 0,
                    watermark: db.get_watermark(wallet.id, stream).unwrap_or(0),
                    error: Some(e),
                }
            }
        };
        outcomes.insert(stream.as_str(), outcome);
    }

    let section = serde_json::to_value(&outcomes).map_err(|e| e.to_string())?;
    db.upsert_report_section(wallet.id, "fetch", &section)
        .map_err(|e| format!("report write failed: {}", e))?;

    // Fan out to the four analyzers; they run independently, no barrier
    for task in TaskType::analyzers() {
        db.enqueue_job(wallet.id, task, None)
            .map_err(|e| format!("analyzer enqueue failed: {}", e))?;
    }
    Ok(())
}

/// Fetch one stream; returns the number of appended transactions
async fn fetch_stream(
    db: &Database,
    wallet: &Wallet,
    chain: Chain,
    stream: TxStream,
    initial_cap: u64,
) -> Result<usize, String> {
    let watermark = db
        .get_watermark(wallet.id, stream)
        .map_err(|e| e.to_string())?;

    let txs = if watermark == 0 {
        // Initial scan: newest transactions first, capped
        explorer::list_transactions(
            &wallet.address,
            chain,
            stream,
            None,
            SortOrder::Descending,
            initial_cap,
        )
        .await
        .map_err(|e| e.to_string())?
    } else {
        // Incremental: everything after the watermark, oldest first
        explorer::list_transactions(
            &wallet.address,
            chain,
            stream,
            Some(watermark + 1),
            SortOrder::Ascending,
            initial_cap,
        )
        .await
        .map_err(|e| e.to_string())?
    };

    if txs.is_empty() {
        logger::debug(
            LogTag::Fetcher,
            &format!(
                "Wallet {} stream {}: nothing new past block {}",
                wallet.id,
                stream.as_str(),
                watermark
            ),
        );
        return Ok(0);
    }

    let max_block = txs
        .iter()
        .filter_map(|tx| tx.get("blockNumber"))
        .filter_map(|b| b.as_str())
        .filter_map(|b| b.parse::<u64>().ok())
        .max()
        .unwrap_or(watermark);

    // On incremental runs the explorer can echo the boundary block; drop
    // rows at or below the watermark so the cache stays append-only
    let fresh: Vec<serde_json::Value> = txs
        .into_iter()
        .filter(|tx| {
            let block = tx
                .get("blockNumber")
                .and_then(|b| b.as_str())
                .and_then(|b| b.parse::<u64>().ok())
                .unwrap_or(0);
            watermark == 0 || block > watermark
        })
        .collect();

    let count = fresh.len();
    db.append_transactions(wallet.id, stream, &fresh, max_block)
        .map_err(|e| e.to_string())?;

    logger::info(
        LogTag::Fetcher,
        &format!(
            "Wallet {} stream {}: cached {} txs, watermark -> {}",
            wallet.id,
            stream.as_str(),
            count,
            max_block
        ),
    );
    Ok(count)
}
