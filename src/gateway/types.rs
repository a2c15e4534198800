/// Provider tags and request payloads for the outbound request queue
use crate::config::{with_config, RateLimits};
use serde::{Deserialize, Serialize};

/// Every outbound HTTP call is attributed to one provider; the tag selects
/// a rate-limit bucket and an endpoint adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiProvider {
    Etherscan,
    Gemini,
}

impl ApiProvider {
    pub fn all() -> [ApiProvider; 2] {
        [ApiProvider::Etherscan, ApiProvider::Gemini]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::Etherscan => "etherscan",
            ApiProvider::Gemini => "gemini",
        }
    }

    pub fn parse(s: &str) -> Option<ApiProvider> {
        match s {
            "etherscan" => Some(ApiProvider::Etherscan),
            "gemini" => Some(ApiProvider::Gemini),
            _ => None,
        }
    }

    /// Rolling-window limits for this provider
    pub fn limits(&self) -> RateLimits {
        with_config(|cfg| match self {
            ApiProvider::Etherscan => cfg.gateway.etherscan_limits,
            ApiProvider::Gemini => cfg.gateway.gemini_limits,
        })
    }
}

impl std::fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logical request payload, persisted verbatim in the queue record.
/// Provider-specific; opaque to the queue machinery itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestData {
    /// Etherscan-V2 style GET: module/action plus extra query parameters,
    /// routed to a chain by its numeric id
    Explorer {
        module: String,
        action: String,
        chain_id: u64,
        #[serde(default)]
        params: Vec<(String, String)>,
    },
    /// AI text generation: a single prompt
    Generate { prompt: String },
}

impl RequestData {
    pub fn explorer(
        module: &str,
        action: &str,
        chain_id: u64,
        params: Vec<(String, String)>,
    ) -> Self {
        RequestData::Explorer {
            module: module.to_string(),
            action: action.to_string(),
            chain_id,
            params,
        }
    }

    pub fn generate(prompt: &str) -> Self {
        RequestData::Generate {
            prompt: prompt.to_string(),
        }
    }
}
