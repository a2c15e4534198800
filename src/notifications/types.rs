//! Notification types for the Telegram sink
use crate::analysis::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of security notifications that can be sent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NotificationType {
    /// Unlimited ERC-20 approval granted to a spender
    UnlimitedApproval {
        wallet: String,
        token: String,
        token_label: Option<String>,
        spender: String,
        spender_label: Option<String>,
    },

    /// Bounded ERC-20 approval worth surfacing
    TokenApproval {
        wallet: String,
        token: String,
        token_label: Option<String>,
        spender: String,
        spender_label: Option<String>,
        amount: String,
    },

    /// Collection-wide NFT operator approval
    NftApproval {
        wallet: String,
        collection: String,
        collection_label: Option<String>,
        operator: String,
        operator_label: Option<String>,
    },

    /// EIP-2612 permit with a far-future deadline
    LongLivedPermit {
        wallet: String,
        token: String,
        token_label: Option<String>,
        spender: String,
        deadline: u64,
    },

    /// Interaction with a risky contract (verified or not)
    RiskyContract {
        wallet: String,
        contract: String,
        label: Option<String>,
        verified: bool,
        reasons: Vec<String>,
        severity: Severity,
    },

    /// Honeypot heuristics fired on a verified contract
    HoneypotAlert {
        wallet: String,
        contract: String,
        label: Option<String>,
        findings: Vec<String>,
    },

    /// Operational error surfaced to the operator chat
    SystemError { message: String, severity: Severity },

    /// Service startup notification
    MonitorStarted { version: String },
}

/// A notification with timestamp
#[derive(Clone, Debug)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Create a new notification with current timestamp
    pub fn new(notification_type: NotificationType) -> Self {
        Self {
            notification_type,
            timestamp: Utc::now(),
        }
    }

    pub fn system_error(message: String, severity: Severity) -> Self {
        Self::new(NotificationType::SystemError { message, severity })
    }

    pub fn monitor_started(version: String) -> Self {
        Self::new(NotificationType::MonitorStarted { version })
    }
}
