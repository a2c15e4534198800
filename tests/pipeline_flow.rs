//! End-to-end pipeline flow over an in-memory database: registration,
//! scheduling, claim semantics, report assembly and scoring. External
//! calls are not exercised here; the analyzers' pure cores have their own
//! unit tests.
use walletwarden::analysis::{activity, approvals};
use walletwarden::database::models::{JobStatus, StateSlot, TaskType, TxStream};
use walletwarden::database::Database;
use walletwarden::scheduler;
use std::collections::HashSet;

const WALLET: &str = "0x1111111111111111111111111111111111111111";
const TOKEN: &str = "0x2222222222222222222222222222222222222222";
const SPENDER: &str = "0x3333333333333333333333333333333333333333";

fn unlimited_approve_tx(block: u64) -> serde_json::Value {
    serde_json::json!({
        "from": WALLET,
        "to": TOKEN,
        "blockNumber": block.to_string(),
        "timeStamp": (1_600_000_000 + block).to_string(),
        "input": format!(
            "0x095ea7b3{:0>64}{}",
            SPENDER.trim_start_matches("0x"),
            "f".repeat(64)
        ),
    })
}

#[test]
fn scheduled_scan_flows_through_the_task_graph() {
    let db = Database::open_in_memory().unwrap();
    let wallet = db.register_wallet("user-1", WALLET, "ethereum", None).unwrap();

    // Scheduler pass enqueues exactly one full_scan
    assert_eq!(scheduler::schedule_full_scans(&db).unwrap(), 1);

    // The full_scan worker's orchestration step: stamp + hand off
    let job = db.claim_next_job(TaskType::FullScan).unwrap().unwrap();
    assert_eq!(job.wallet_id, wallet.id);
    db.touch_last_scan(wallet.id).unwrap();
    db.enqueue_job(wallet.id, TaskType::FetchTransactions, None)
        .unwrap();
    db.complete_job(job.id).unwrap();

    let fetch = db
        .claim_next_job(TaskType::FetchTransactions)
        .unwrap()
        .unwrap();
    assert_eq!(fetch.status, JobStatus::Processing);

    // Fetch completion fans out to the four analyzers
    for task in TaskType::analyzers() {
        db.enqueue_job(wallet.id, task, None).unwrap();
    }
    db.complete_job(fetch.id).unwrap();

    for task in TaskType::analyzers() {
        assert!(db.claim_next_job(task).unwrap().is_some());
    }
    // FIFO per type is exhausted
    for task in TaskType::analyzers() {
        assert!(db.claim_next_job(task).unwrap().is_none());
    }

    let scanned = db.get_wallet(wallet.id).unwrap().unwrap();
    assert!(scanned.last_scan_at.is_some());
}

#[test]
fn cached_transactions_drive_intents_and_score() {
    let db = Database::open_in_memory().unwrap();
    let wallet = db.register_wallet("user-1", WALLET, "ethereum", None).unwrap();

    let tx = unlimited_approve_tx(100);
    db.append_transactions(wallet.id, TxStream::Normal, &[tx], 100)
        .unwrap();

    let txs = db.get_cached_transactions(wallet.id, TxStream::Normal).unwrap();
    let intents = approvals::collect_intents(WALLET, &txs);
    assert_eq!(intents.len(), 1);

    // Simulate the approvals section the worker would write
    db.upsert_report_section(
        wallet.id,
        "approvals",
        &serde_json::json!({
            "count": 1,
            "items": [{"kind": "erc20", "is_unlimited": true}],
        }),
    )
    .unwrap();

    let metrics = activity::compute_metrics(WALLET, &txs);
    let details = db.get_report(wallet.id).unwrap().unwrap().details;
    let score = activity::compute_risk_score(&details, &metrics);
    // 10 for the unlimited approval, 10 for tx count < 10; the 2020-era
    // timestamp keeps the young-wallet bonus out
    assert_eq!(score, 20);

    let summary = activity::build_summary(score, &details, &metrics);
    db.set_report_score(wallet.id, score, &summary).unwrap();

    let report = db.get_report(wallet.id).unwrap().unwrap();
    assert_eq!(report.risk_score, 20);
    assert_eq!(report.details["approvals"]["count"], 1);
}

#[test]
fn analysis_state_diff_suppresses_repeat_findings() {
    let db = Database::open_in_memory().unwrap();
    let wallet = db.register_wallet("user-1", WALLET, "ethereum", None).unwrap();

    let fingerprint = format!("erc20-{}-{}", TOKEN, SPENDER);
    let current: HashSet<String> = [fingerprint.clone()].into_iter().collect();

    // First cycle: the finding is new
    let previous = db
        .get_analysis_state(wallet.id, StateSlot::Approvals)
        .unwrap();
    assert!(!previous.contains(&fingerprint));
    db.set_analysis_state(wallet.id, StateSlot::Approvals, &current)
        .unwrap();

    // Second cycle: identical output diffs to nothing
    let previous = db
        .get_analysis_state(wallet.id, StateSlot::Approvals)
        .unwrap();
    let new: Vec<&String> = current.iter().filter(|f| !previous.contains(*f)).collect();
    assert!(new.is_empty());
}

#[test]
fn wallet_deletion_is_complete() {
    let db = Database::open_in_memory().unwrap();
    let wallet = db.register_wallet("user-1", WALLET, "ethereum", None).unwrap();
    db.enqueue_job(wallet.id, TaskType::FullScan, None).unwrap();
    db.append_transactions(wallet.id, TxStream::Normal, &[unlimited_approve_tx(5)], 5)
        .unwrap();
    db.set_report_score(wallet.id, 10, "test").unwrap();

    db.delete_wallet(wallet.id).unwrap();

    assert!(db.get_wallet(wallet.id).unwrap().is_none());
    assert!(db.get_report(wallet.id).unwrap().is_none());
    assert!(db.claim_next_job(TaskType::FullScan).unwrap().is_none());
    assert!(db
        .get_cached_transactions(wallet.id, TxStream::Normal)
        .unwrap()
        .is_empty());
}
