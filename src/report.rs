//! Leveled progress reporting for CLI and refresh runs.
//!
//! Structured entries written to stderr, keeping stdout free for payload
//! output. The pipeline core never logs; reporting happens at the
//! orchestration layer.

use serde::{Deserialize, Serialize};

/// Log level for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "..",
            LogLevel::Success => "ok",
            LogLevel::Warning => "!!",
            LogLevel::Error => "xx",
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Optional indentation level (for nested detail lines)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Success,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warning,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Write this entry to stderr.
    pub fn emit(&self) {
        let pad = "  ".repeat(self.indent as usize);
        eprintln!("[{}] {}{}", self.level.prefix(), pad, self.message);
    }
}

pub fn log_info(message: impl Into<String>) {
    LogEntry::info(message).emit();
}

pub fn log_success(message: impl Into<String>) {
    LogEntry::success(message).emit();
}

pub fn log_warning(message: impl Into<String>) {
    LogEntry::warning(message).emit();
}

pub fn log_error(message: impl Into<String>) {
    LogEntry::error(message).emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builders() {
        let entry = LogEntry::warning("low confidence").with_indent(2);
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.indent, 2);
        assert_eq!(entry.message, "low confidence");
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&LogLevel::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }
}
