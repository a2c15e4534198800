//! Stateful alert diffing
//!
//! Every analyzer computes a fingerprint set for its findings. Diffing the
//! set against the wallet's stored state yields the newly-seen subset; only
//! new items at or above the severity threshold produce notifications, and
//! the stored state is replaced in the same pass. Running the same output
//! twice therefore emits nothing the second time.
use super::service::queue_notification;
use super::types::Notification;
use crate::analysis::types::Severity;
use crate::database::models::StateSlot;
use crate::database::Database;
use crate::logger::{self, LogTag};
use std::collections::HashSet;

/// Minimum severity for a user-facing alert
pub const NOTIFY_SEVERITY_THRESHOLD: Severity = Severity::High;

/// One alert candidate produced by an analyzer
pub struct FindingAlert {
    pub fingerprint: String,
    pub severity: Severity,
    pub notification: Notification,
}

/// Pure diff: which alerts are new relative to the previous state and meet
/// the severity threshold
pub fn select_new_alerts<'a>(
    alerts: &'a [FindingAlert],
    previous: &HashSet<String>,
) -> Vec<&'a FindingAlert> {
    alerts
        .iter()
        .filter(|alert| !previous.contains(&alert.fingerprint))
        .filter(|alert| alert.severity >= NOTIFY_SEVERITY_THRESHOLD)
        .collect()
}

/// Diff the analyzer's current output against the stored slot, send alerts
/// for the new subset, and replace the stored fingerprint set.
///
/// `current_fingerprints` is the full set for the slot (alerts plus
/// below-threshold findings) so that suppressed items do not re-alert once
/// they later cross the threshold boundary for some other reason.
pub fn diff_notify_and_store(
    db: &Database,
    wallet_id: i64,
    slot: StateSlot,
    alerts: Vec<FindingAlert>,
    current_fingerprints: &HashSet<String>,
) -> Result<usize, String> {
    let previous = db
        .get_analysis_state(wallet_id, slot)
        .map_err(|e| format!("state read failed: {}", e))?;

    let new_alerts = select_new_alerts(&alerts, &previous);
    let sent = new_alerts.len();
    for alert in new_alerts {
        logger::debug(
            LogTag::Notify,
            &format!(
                "New {} finding for wallet {}: {}",
                alert.severity, wallet_id, alert.fingerprint
            ),
        );
        queue_notification(alert.notification.clone());
    }

    db.set_analysis_state(wallet_id, slot, current_fingerprints)
        .map_err(|e| format!("state write failed: {}", e))?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::types::NotificationType;

    fn alert(fingerprint: &str, severity: Severity) -> FindingAlert {
        FindingAlert {
            fingerprint: fingerprint.to_string(),
            severity,
            notification: Notification::system_error("test".to_string(), severity),
        }
    }

    #[test]
    fn test_diff_emits_only_new_items() {
        let mut previous = HashSet::new();
        previous.insert("erc20-0xa-0xb".to_string());

        let alerts = vec![
            alert("erc20-0xa-0xb", Severity::High),
            alert("erc20-0xc-0xd", Severity::High),
        ];
        let new = select_new_alerts(&alerts, &previous);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].fingerprint, "erc20-0xc-0xd");
    }

    #[test]
    fn test_below_threshold_items_are_suppressed() {
        let previous = HashSet::new();
        let alerts = vec![
            alert("permit2-0xp-0xw", Severity::Informational),
            alert("erc20-0xa-0xb", Severity::Medium),
            alert("nft-0xc-0xd", Severity::High),
            alert("contract-0xe", Severity::Critical),
        ];
        let new = select_new_alerts(&alerts, &previous);
        let fingerprints: Vec<&str> = new.iter().map(|a| a.fingerprint.as_str()).collect();
        assert_eq!(fingerprints, vec!["nft-0xc-0xd", "contract-0xe"]);
    }

    #[test]
    fn test_notify_is_idempotent_across_runs() {
        let db = Database::open_in_memory().unwrap();
        let fingerprints: HashSet<String> =
            vec!["erc20-0xa-0xb".to_string()].into_iter().collect();
        let make_alerts = || {
            vec![FindingAlert {
                fingerprint: "erc20-0xa-0xb".to_string(),
                severity: Severity::High,
                notification: Notification::new(NotificationType::SystemError {
                    message: "x".to_string(),
                    severity: Severity::High,
                }),
            }]
        };

        // First run sees the finding as new
        let sent = diff_notify_and_store(&db, 1, StateSlot::Approvals, make_alerts(), &fingerprints)
            .unwrap();
        assert_eq!(sent, 1);

        // Second run with updated state emits nothing
        let sent = diff_notify_and_store(&db, 1, StateSlot::Approvals, make_alerts(), &fingerprints)
            .unwrap();
        assert_eq!(sent, 0);
    }
}
