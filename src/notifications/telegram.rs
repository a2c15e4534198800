//! Telegram notification sink
//!
//! A stateless transport: messages are formatted as HTML and sent to the
//! configured chat. Delivery failures are logged by the caller, never
//! retried, and never block the pipeline.
use super::types::{Notification, NotificationType};
use crate::analysis::types::Severity;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

/// Telegram notifier for sending messages
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier
    ///
    /// # Arguments
    /// * `bot_token` - Telegram bot token from @BotFather
    /// * `chat_id` - Chat ID to send notifications to
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, String> {
        if bot_token.is_empty() {
            return Err("Bot token is empty".to_string());
        }
        if chat_id.is_empty() {
            return Err("Chat ID is empty".to_string());
        }

        let chat_id_parsed: i64 = chat_id
            .parse()
            .map_err(|e| format!("Invalid chat ID '{}': {}", chat_id, e))?;

        Ok(Self {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id_parsed),
        })
    }

    /// Send a notification
    pub async fn send(&self, notification: &Notification) -> Result<(), String> {
        let message = self.format_notification(notification);
        self.send_message(&message).await
    }

    /// Send a plain text message
    pub async fn send_message(&self, message: &str) -> Result<(), String> {
        self.bot
            .send_message(self.chat_id, message)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| format!("Failed to send Telegram message: {}", e))?;
        Ok(())
    }

    /// Format a notification into a Telegram message
    fn format_notification(&self, notification: &Notification) -> String {
        match &notification.notification_type {
            NotificationType::UnlimitedApproval {
                wallet,
                token,
                token_label,
                spender,
                spender_label,
            } => {
                format!(
                    "🚨 <b>Unlimited ERC20 approval granted</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Token: {}\n\
                     Spender: {}\n\n\
                     This spender can move your entire balance at any time.\n\
                     Consider revoking if you do not recognize it.",
                    Self::truncate_address(wallet),
                    Self::labeled(token, token_label),
                    Self::labeled(spender, spender_label),
                )
            }

            NotificationType::TokenApproval {
                wallet,
                token,
                token_label,
                spender,
                spender_label,
                amount,
            } => {
                format!(
                    "⚠️ <b>Token approval granted</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Token: {}\n\
                     Spender: {}\n\
                     Amount: {}",
                    Self::truncate_address(wallet),
                    Self::labeled(token, token_label),
                    Self::labeled(spender, spender_label),
                    amount,
                )
            }

            NotificationType::NftApproval {
                wallet,
                collection,
                collection_label,
                operator,
                operator_label,
            } => {
                format!(
                    "🚨 <b>Collection-wide NFT approval</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Collection: {}\n\
                     Operator: {}\n\n\
                     This operator can transfer every NFT in the collection.",
                    Self::truncate_address(wallet),
                    Self::labeled(collection, collection_label),
                    Self::labeled(operator, operator_label),
                )
            }

            NotificationType::LongLivedPermit {
                wallet,
                token,
                token_label,
                spender,
                deadline,
            } => {
                format!(
                    "⚠️ <b>Long-lived permit signed</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Token: {}\n\
                     Spender: <code>{}</code>\n\
                     Deadline: more than a year away (unix {})",
                    Self::truncate_address(wallet),
                    Self::labeled(token, token_label),
                    Self::truncate_address(spender),
                    deadline,
                )
            }

            NotificationType::RiskyContract {
                wallet,
                contract,
                label,
                verified,
                reasons,
                severity,
            } => {
                let emoji = match severity {
                    Severity::Critical | Severity::High => "🚨",
                    _ => "⚠️",
                };
                let kind = if *verified {
                    "verified contract with risky patterns"
                } else {
                    "unverified contract with risky functions"
                };
                format!(
                    "{} <b>Interaction with {}</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Contract: {}\n\
                     Findings: {}",
                    emoji,
                    kind,
                    Self::truncate_address(wallet),
                    Self::labeled(contract, label),
                    reasons.join(", "),
                )
            }

            NotificationType::HoneypotAlert {
                wallet,
                contract,
                label,
                findings,
            } => {
                format!(
                    "🚨 <b>CRITICAL HONEYPOT ALERT</b>\n\n\
                     Wallet: <code>{}</code>\n\
                     Contract: {}\n\
                     Findings: {}\n\n\
                     Interacting further with this contract may lock or drain funds.",
                    Self::truncate_address(wallet),
                    Self::labeled(contract, label),
                    findings.join(", "),
                )
            }

            NotificationType::SystemError { message, severity } => {
                let emoji = match severity {
                    Severity::Critical => "🚨",
                    Severity::High => "❌",
                    _ => "⚠️",
                };
                format!("{} <b>System error</b>\n\n{}", emoji, message)
            }

            NotificationType::MonitorStarted { version } => {
                format!(
                    "🛡️ <b>WalletWarden started</b>\n\nVersion: {}",
                    version
                )
            }
        }
    }

    /// "Label (0xab…cd)" when a label exists, otherwise the short address
    fn labeled(address: &str, label: &Option<String>) -> String {
        match label {
            Some(label) => format!("{} (<code>{}</code>)", label, Self::truncate_address(address)),
            None => format!("<code>{}</code>", Self::truncate_address(address)),
        }
    }

    /// Truncate a wallet address for display
    fn truncate_address(address: &str) -> String {
        if address.len() > 12 {
            format!("{}...{}", &address[..6], &address[address.len() - 4..])
        } else {
            address.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_credentials() {
        assert!(TelegramNotifier::new("", "123").is_err());
        assert!(TelegramNotifier::new("token", "").is_err());
        assert!(TelegramNotifier::new("token", "not-a-number").is_err());
    }

    #[test]
    fn test_honeypot_alert_uses_critical_title() {
        let notifier = TelegramNotifier::new("token", "123").unwrap();
        let message = notifier.format_notification(&Notification::new(
            NotificationType::HoneypotAlert {
                wallet: "0x1111111111111111111111111111111111111111".to_string(),
                contract: "0x2222222222222222222222222222222222222222".to_string(),
                label: None,
                findings: vec!["hidden approve in transfer override".to_string()],
            },
        ));
        assert!(message.contains("CRITICAL HONEYPOT ALERT"));
    }

    #[test]
    fn test_unlimited_approval_message_names_spender() {
        let notifier = TelegramNotifier::new("token", "123").unwrap();
        let message = notifier.format_notification(&Notification::new(
            NotificationType::UnlimitedApproval {
                wallet: "0x1111111111111111111111111111111111111111".to_string(),
                token: "0x3333333333333333333333333333333333333333".to_string(),
                token_label: Some("USDC".to_string()),
                spender: "0x4444444444444444444444444444444444444444".to_string(),
                spender_label: None,
            },
        ));
        assert!(message.contains("Unlimited ERC20 approval"));
        assert!(message.contains("USDC"));
        assert!(message.contains("0x4444..4444") || message.contains("0x4444"));
    }
}
