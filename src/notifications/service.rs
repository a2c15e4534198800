//! Global notification service
//!
//! Holds the process-wide Telegram notifier. Sends are fire-and-forget:
//! a delivery failure is logged and dropped, never retried, so the
//! analysis pipeline can never block on the transport.
use super::telegram::TelegramNotifier;
use super::types::Notification;
use crate::config::with_config;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_NOTIFIER: OnceCell<Option<Arc<TelegramNotifier>>> = OnceCell::new();

/// Initialize the notifier from config. A missing bot token just disables
/// the transport; the pipeline keeps running and diffs keep updating.
pub fn init_notification_service() {
    let telegram = with_config(|cfg| cfg.telegram.clone());
    let notifier = if telegram.is_configured() {
        match TelegramNotifier::new(&telegram.bot_token, &telegram.chat_id) {
            Ok(notifier) => {
                logger::info(LogTag::Notify, "Telegram notifier configured");
                Some(Arc::new(notifier))
            }
            Err(e) => {
                logger::warning(
                    LogTag::Notify,
                    &format!("Telegram notifier disabled: {}", e),
                );
                None
            }
        }
    } else {
        logger::info(
            LogTag::Notify,
            "Telegram not configured - notifications disabled",
        );
        None
    };
    let _ = GLOBAL_NOTIFIER.set(notifier);
}

pub fn is_notification_service_enabled() -> bool {
    matches!(GLOBAL_NOTIFIER.get(), Some(Some(_)))
}

/// Send a notification without blocking the caller
pub fn queue_notification(notification: Notification) {
    let Some(Some(notifier)) = GLOBAL_NOTIFIER.get() else {
        logger::debug(LogTag::Notify, "Notification dropped (transport disabled)");
        return;
    };
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notification).await {
            // Never retried: the next analysis cycle re-diffs anyway
            logger::warning(LogTag::Notify, &format!("Delivery failed: {}", e));
        }
    });
}
