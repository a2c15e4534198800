/// Database row models shared across the store modules
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// WALLETS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub address: String,
    pub chain: String,
    pub label: Option<String>,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Transaction streams cached per wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStream {
    Normal,
    Token,
    Nft,
}

impl TxStream {
    pub fn all() -> [TxStream; 3] {
        [TxStream::Normal, TxStream::Token, TxStream::Nft]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStream::Normal => "normal",
            TxStream::Token => "token",
            TxStream::Nft => "nft",
        }
    }

    pub fn parse(s: &str) -> Option<TxStream> {
        match s {
            "normal" => Some(TxStream::Normal),
            "token" => Some(TxStream::Token),
            "nft" => Some(TxStream::Nft),
            _ => None,
        }
    }
}

/// Analysis-state slots diffed by the stateful notifier.
/// Each analyzer owns exactly one slot, so there is no cross-worker
/// contention on the stored fingerprint sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSlot {
    Approvals,
    Contracts,
}

impl StateSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateSlot::Approvals => "approvals",
            StateSlot::Contracts => "contracts",
        }
    }
}

// =============================================================================
// ANALYSIS JOBS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FullScan,
    FetchTransactions,
    AnalyzeApprovals,
    AnalyzeContracts,
    AnalyzeActivity,
    AnalyzeLpStake,
}

impl TaskType {
    pub fn all() -> [TaskType; 6] {
        [
            TaskType::FullScan,
            TaskType::FetchTransactions,
            TaskType::AnalyzeApprovals,
            TaskType::AnalyzeContracts,
            TaskType::AnalyzeActivity,
            TaskType::AnalyzeLpStake,
        ]
    }

    /// The four analyzers enqueued after a transaction fetch
    pub fn analyzers() -> [TaskType; 4] {
        [
            TaskType::AnalyzeApprovals,
            TaskType::AnalyzeContracts,
            TaskType::AnalyzeActivity,
            TaskType::AnalyzeLpStake,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::FullScan => "full_scan",
            TaskType::FetchTransactions => "fetch_transactions",
            TaskType::AnalyzeApprovals => "analyze_approvals",
            TaskType::AnalyzeContracts => "analyze_contracts",
            TaskType::AnalyzeActivity => "analyze_activity",
            TaskType::AnalyzeLpStake => "analyze_lp_stake",
        }
    }

    pub fn parse(s: &str) -> Option<TaskType> {
        match s {
            "full_scan" => Some(TaskType::FullScan),
            "fetch_transactions" => Some(TaskType::FetchTransactions),
            "analyze_approvals" => Some(TaskType::AnalyzeApprovals),
            "analyze_contracts" => Some(TaskType::AnalyzeContracts),
            "analyze_activity" => Some(TaskType::AnalyzeActivity),
            "analyze_lp_stake" => Some(TaskType::AnalyzeLpStake),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: i64,
    pub wallet_id: i64,
    pub task_type: TaskType,
    pub status: JobStatus,
    pub attempts: u32,
    pub payload: Option<serde_json::Value>,
    pub created_at_ms: i64,
    pub processed_at_ms: Option<i64>,
}

// =============================================================================
// API REQUESTS (gateway queue)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequestRecord {
    pub id: i64,
    pub provider: String,
    pub request_data: serde_json::Value,
    pub status: RequestStatus,
    pub attempts: u32,
    pub processing_id: Option<String>,
    pub retry_at_ms: Option<i64>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at_ms: i64,
    pub completed_at_ms: Option<i64>,
}

/// Operator-facing queue statistics
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub completed_last_5_min: u64,
    /// `pending / (completed_last_5_min / 300)` in seconds; None when the
    /// recent completion rate is zero
    pub estimated_drain_seconds: Option<u64>,
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub wallet_id: i64,
    pub risk_score: u8,
    pub summary: String,
    pub details: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// LABELS / CONTRACT CACHE / GUEST SCANS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressLabelRecord {
    pub address: String,
    pub chain: String,
    pub label: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct StoredContractAnalysis {
    pub contract_address: String,
    pub chain: String,
    pub analysis: serde_json::Value,
    pub last_analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GuestScanRecord {
    pub wallet_address: String,
    pub result: serde_json::Value,
    pub last_scanned_at: DateTime<Utc>,
}
