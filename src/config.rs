use crate::chains::Chain;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

/// Runtime configuration resolved from environment variables.
///
/// Every field has a default so the binary starts without any environment;
/// API keys default to empty strings and the affected providers simply fail
/// their requests until configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_path: String,
    pub api_port: u16,
    pub etherscan_api_key: String,
    pub gemini_api_key: String,
    pub telegram: TelegramConfig,
    pub scanner: ScannerConfig,
    pub gateway: GatewayConfig,
    pub rpc_urls: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Cap for the initial (watermark = 0) transaction scan per stream
    pub initial_scan_max_tx: u64,
    /// Hours between scheduled full scans
    pub scan_interval_hours: u64,
    /// Seconds between queue polls for each analysis worker
    pub worker_poll_seconds: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            initial_scan_max_tx: 1000,
            scan_interval_hours: 24,
            worker_poll_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Caller-side wait cap for a submitted request
    pub request_timeout_seconds: u64,
    /// Queue-level retry cap; a request is terminal once attempts reach this
    pub max_attempts: u32,
    /// Per-provider rolling-window limits
    pub etherscan_limits: RateLimits,
    pub gemini_limits: RateLimits,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 120,
            max_attempts: 3,
            etherscan_limits: RateLimits {
                per_second: 4,
                per_minute: 240,
                per_day: 100_000,
            },
            gemini_limits: RateLimits {
                per_second: 1,
                per_minute: 50,
                per_day: 1_000,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimits {
    pub per_second: u64,
    pub per_minute: u64,
    pub per_day: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "walletwarden.db".to_string(),
            api_port: 8080,
            etherscan_api_key: String::new(),
            gemini_api_key: String::new(),
            telegram: TelegramConfig {
                bot_token: String::new(),
                chat_id: String::new(),
            },
            scanner: ScannerConfig::default(),
            gateway: GatewayConfig::default(),
            rpc_urls: HashMap::new(),
        }
    }
}

impl Config {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        let defaults = GatewayConfig::default();

        let mut rpc_urls = HashMap::new();
        for chain in Chain::all() {
            let url = env::var(chain.rpc_env_var())
                .unwrap_or_else(|_| chain.default_rpc_url().to_string());
            rpc_urls.insert(chain.name().to_string(), url);
        }

        Self {
            database_path: env_or("DATABASE_PATH", "walletwarden.db"),
            api_port: env_parsed("API_PORT", 8080),
            etherscan_api_key: env_or("ETHERSCAN_API_KEY", ""),
            gemini_api_key: env_or("GEMINI_API_KEY", ""),
            telegram: TelegramConfig {
                bot_token: env_or("TELEGRAM_BOT_TOKEN", ""),
                chat_id: env_or("TELEGRAM_CHAT_ID", ""),
            },
            scanner: ScannerConfig {
                initial_scan_max_tx: env_parsed("INITIAL_SCAN_MAX_TX", 1000),
                scan_interval_hours: env_parsed("SCAN_INTERVAL_HOURS", 24),
                worker_poll_seconds: env_parsed("WORKER_POLL_SECONDS", 5),
            },
            gateway: GatewayConfig {
                request_timeout_seconds: env_parsed("REQUEST_TIMEOUT_SECONDS", 120),
                max_attempts: env_parsed("MAX_ATTEMPTS", 3),
                etherscan_limits: RateLimits {
                    per_second: env_parsed(
                        "ETHERSCAN_RATE_LIMIT_SECOND",
                        defaults.etherscan_limits.per_second,
                    ),
                    per_minute: env_parsed(
                        "ETHERSCAN_RATE_LIMIT_MINUTE",
                        defaults.etherscan_limits.per_minute,
                    ),
                    per_day: env_parsed(
                        "ETHERSCAN_RATE_LIMIT_DAY",
                        defaults.etherscan_limits.per_day,
                    ),
                },
                gemini_limits: RateLimits {
                    per_second: env_parsed(
                        "GEMINI_RATE_LIMIT_SECOND",
                        defaults.gemini_limits.per_second,
                    ),
                    per_minute: env_parsed(
                        "GEMINI_RATE_LIMIT_MINUTE",
                        defaults.gemini_limits.per_minute,
                    ),
                    per_day: env_parsed("GEMINI_RATE_LIMIT_DAY", defaults.gemini_limits.per_day),
                },
            },
            rpc_urls,
        }
    }

    /// JSON-RPC endpoint for a chain
    pub fn rpc_url(&self, chain: Chain) -> String {
        self.rpc_urls
            .get(chain.name())
            .cloned()
            .unwrap_or_else(|| chain.default_rpc_url().to_string())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// =============================================================================
// GLOBAL CONFIG ACCESS
// =============================================================================

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::from_env()));

/// Load (or reload) configuration from the environment
pub fn load_config() -> Result<(), String> {
    let fresh = Config::from_env();
    let mut guard = CONFIG
        .write()
        .map_err(|_| "Config lock poisoned".to_string())?;
    *guard = fresh;
    Ok(())
}

/// Read a value out of the global config
pub fn with_config<T>(f: impl FnOnce(&Config) -> T) -> T {
    let guard = CONFIG.read().expect("Config lock poisoned");
    f(&guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_and_timeouts() {
        let config = Config::default();
        assert_eq!(config.scanner.initial_scan_max_tx, 1000);
        assert_eq!(config.scanner.scan_interval_hours, 24);
        assert_eq!(config.gateway.request_timeout_seconds, 120);
        assert_eq!(config.gateway.max_attempts, 3);
        assert_eq!(config.gateway.etherscan_limits.per_second, 4);
        assert_eq!(config.gateway.etherscan_limits.per_minute, 240);
        assert_eq!(config.gateway.etherscan_limits.per_day, 100_000);
        assert_eq!(config.gateway.gemini_limits.per_second, 1);
        assert_eq!(config.gateway.gemini_limits.per_minute, 50);
        assert_eq!(config.gateway.gemini_limits.per_day, 1_000);
    }

    #[test]
    fn test_rpc_url_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(
            config.rpc_url(Chain::Base),
            Chain::Base.default_rpc_url().to_string()
        );
    }
}
