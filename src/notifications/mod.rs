//! Stateful notification layer
//!
//! Analyzers hand their findings here as (fingerprint, severity, message)
//! triples. The notifier diffs fingerprints against the wallet's stored
//! analysis state so users only hear about newly-seen findings, then the
//! Telegram sink delivers best-effort. Transport failures never block or
//! retry.

pub mod notifier;
mod service;
mod telegram;
pub mod types;

pub use notifier::{diff_notify_and_store, FindingAlert, NOTIFY_SEVERITY_THRESHOLD};
pub use service::{init_notification_service, is_notification_service_enabled, queue_notification};
pub use telegram::TelegramNotifier;
pub use types::{Notification, NotificationType};
