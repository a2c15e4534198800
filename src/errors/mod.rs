/// Structured error types for the analysis pipeline.
///
/// The variants follow the failure taxonomy the pipeline is built around:
/// transient external failures are retried by the gateway, permanent ones
/// surface immediately, on-chain read failures are absorbed by callers as
/// unknowns, and worker failures mark the owning job failed without
/// retrying.

#[derive(Debug, Clone)]
pub enum WardenError {
    /// Transport errors, 5xx responses, explorer rate-limit messages.
    /// Retried by the gateway up to MAX_ATTEMPTS with exponential backoff.
    TransientExternal { provider: String, message: String },

    /// Non-retryable provider failures: 4xx other than rate limit, AI
    /// content filter, structurally unparseable responses.
    PermanentExternal { provider: String, message: String },

    /// Caller-side wait for a gateway request expired. The persisted record
    /// may still complete later and is reaped separately.
    Timeout { seconds: u64 },

    /// Persistence failures
    Database { message: String },

    /// Invalid or missing configuration
    Configuration { message: String },

    /// Malformed data (calldata, JSON payloads, addresses)
    Parse { what: String, message: String },

    /// Anything escaping an analyzer; marks the owning job failed
    Worker { task: String, message: String },
}

impl std::fmt::Display for WardenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WardenError::TransientExternal { provider, message } => {
                write!(f, "Transient {} error: {}", provider, message)
            }
            WardenError::PermanentExternal { provider, message } => {
                write!(f, "Permanent {} error: {}", provider, message)
            }
            WardenError::Timeout { seconds } => {
                write!(f, "Request timed out after {}s", seconds)
            }
            WardenError::Database { message } => write!(f, "Database error: {}", message),
            WardenError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            WardenError::Parse { what, message } => {
                write!(f, "Failed to parse {}: {}", what, message)
            }
            WardenError::Worker { task, message } => {
                write!(f, "Worker {} failed: {}", task, message)
            }
        }
    }
}

impl std::error::Error for WardenError {}

impl WardenError {
    /// Whether the gateway should re-queue this failure
    pub fn is_transient(&self) -> bool {
        matches!(self, WardenError::TransientExternal { .. })
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        WardenError::TransientExternal {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        WardenError::PermanentExternal {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        WardenError::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        WardenError::Configuration {
            message: message.into(),
        }
    }

    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        WardenError::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn worker(task: impl Into<String>, message: impl Into<String>) -> Self {
        WardenError::Worker {
            task: task.into(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for WardenError {
    fn from(err: rusqlite::Error) -> Self {
        WardenError::Database {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        WardenError::Parse {
            what: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for WardenError {
    fn from(err: reqwest::Error) -> Self {
        // Status-level classification happens at the dispatch site; at this
        // layer every reqwest failure is a transport problem.
        WardenError::TransientExternal {
            provider: "http".to_string(),
            message: err.to_string(),
        }
    }
}
