/// Log tags for categorizing log messages by subsystem.
///
/// Each tag maps to a `--debug-<module>` command-line flag that gates
/// DEBUG-level output for that subsystem.
use colored::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTag {
    System,
    Gateway,
    Queue,
    Fetcher,
    Approvals,
    Contracts,
    Activity,
    LpStake,
    Labels,
    Notify,
    Scheduler,
    Webserver,
    Database,
    Chain,
    Other(String),
}

impl LogTag {
    /// Fixed-width display name used in the log prefix
    pub fn name(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Gateway => "GATEWAY".to_string(),
            LogTag::Queue => "QUEUE".to_string(),
            LogTag::Fetcher => "FETCHER".to_string(),
            LogTag::Approvals => "APPROVAL".to_string(),
            LogTag::Contracts => "CONTRACT".to_string(),
            LogTag::Activity => "ACTIVITY".to_string(),
            LogTag::LpStake => "LPSTAKE".to_string(),
            LogTag::Labels => "LABELS".to_string(),
            LogTag::Notify => "NOTIFY".to_string(),
            LogTag::Scheduler => "SCHEDULE".to_string(),
            LogTag::Webserver => "WEB".to_string(),
            LogTag::Database => "DATABASE".to_string(),
            LogTag::Chain => "CHAIN".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }

    /// Debug flag that enables DEBUG output for this tag. The four
    /// analyzer tags share one flag since their output interleaves anyway.
    pub fn debug_flag(&self) -> String {
        match self {
            LogTag::System => "--debug-system".to_string(),
            LogTag::Gateway => "--debug-gateway".to_string(),
            LogTag::Queue => "--debug-queue".to_string(),
            LogTag::Fetcher => "--debug-fetcher".to_string(),
            LogTag::Approvals | LogTag::Contracts | LogTag::Activity | LogTag::LpStake => {
                "--debug-workers".to_string()
            }
            LogTag::Labels => "--debug-labels".to_string(),
            LogTag::Notify => "--debug-notify".to_string(),
            LogTag::Scheduler => "--debug-scheduler".to_string(),
            LogTag::Webserver => "--debug-webserver".to_string(),
            LogTag::Database => "--debug-database".to_string(),
            LogTag::Chain => "--debug-chain".to_string(),
            LogTag::Other(s) => format!("--debug-{}", s.to_lowercase()),
        }
    }

    /// Colored fixed-width representation for console output
    pub fn colored(&self, width: usize) -> ColoredString {
        let padded = format!("{:<width$}", self.name(), width = width);
        match self {
            LogTag::System => padded.bright_yellow().bold(),
            LogTag::Gateway => padded.bright_cyan().bold(),
            LogTag::Queue => padded.bright_blue().bold(),
            LogTag::Fetcher => padded.bright_green().bold(),
            LogTag::Approvals => padded.bright_red().bold(),
            LogTag::Contracts => padded.bright_magenta().bold(),
            LogTag::Activity => padded.green().bold(),
            LogTag::LpStake => padded.cyan().bold(),
            LogTag::Labels => padded.blue().bold(),
            LogTag::Notify => padded.magenta().bold(),
            LogTag::Scheduler => padded.yellow().bold(),
            LogTag::Webserver => padded.bright_white().bold(),
            LogTag::Database => padded.white().bold(),
            LogTag::Chain => padded.bright_black().bold(),
            LogTag::Other(_) => padded.white().bold(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
