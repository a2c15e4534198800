/// Core log formatting and filtering
use crate::arguments;
use crate::logger::levels::LogLevel;
use crate::logger::tags::LogTag;
use chrono::Local;
use colored::*;

/// Fixed column widths for aligned console output
const TAG_WIDTH: usize = 8;
const LEVEL_WIDTH: usize = 7;

/// Decide whether a message at this level/tag should be printed.
///
/// - Error/Warning/Info: always shown
/// - Debug: only with the tag's `--debug-<module>` flag (or `--debug-all`)
/// - Verbose: only with `--verbose`
fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    match level {
        LogLevel::Error | LogLevel::Warning | LogLevel::Info => true,
        LogLevel::Debug => {
            arguments::has_arg("--debug-all") || arguments::has_arg(&tag.debug_flag())
        }
        LogLevel::Verbose => arguments::has_arg("--verbose"),
    }
}

pub(crate) fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    let time = Local::now().format("%H:%M:%S").to_string().dimmed();

    let level_str = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    let level_colored = match level {
        LogLevel::Error => level_str.bright_red().bold(),
        LogLevel::Warning => level_str.bright_yellow().bold(),
        LogLevel::Info => level_str.bright_blue().bold(),
        LogLevel::Debug => level_str.bright_black().bold(),
        LogLevel::Verbose => level_str.bright_black(),
    };

    println!(
        "{} [{}] [{}] {}",
        time,
        tag.colored(TAG_WIDTH),
        level_colored,
        message
    );
}
