//! Decision logging for blocked (and optionally allowed) commands.
//!
//! Logging is strictly best-effort: any failure to open or write the log is
//! swallowed so the hook path can never stall or error on account of
//! observability.

use crate::classify::Decision;
use crate::config::{GeneralConfig, LogFormat};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// A structured log entry for one classification.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub decision: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LogEntry {
    /// Build an entry from a classification outcome.
    #[must_use]
    pub fn from_decision(decision: &Decision, command: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            decision: if decision.blocked { "block" } else { "allow" }.to_string(),
            command: command.to_string(),
            reason: decision.reason.clone(),
        }
    }

    /// Render as a human-readable text block.
    #[must_use]
    pub fn format_text(&self) -> String {
        let mut text = format!("[{}] [{}] {}\n", self.timestamp, self.decision, self.command);
        if let Some(reason) = &self.reason {
            // Keep multi-line reasons on one log line each, indented.
            for line in reason.lines() {
                text.push_str("  ");
                text.push_str(line);
                text.push('\n');
            }
        }
        text
    }

    /// Render as a single JSON line.
    #[must_use]
    pub fn format_json(&self) -> String {
        serde_json::to_string(self).map_or_else(|_| String::new(), |json| format!("{json}\n"))
    }
}

/// Append-only decision logger.
pub struct DecisionLogger {
    writer: Mutex<BufWriter<File>>,
    format: LogFormat,
}

impl DecisionLogger {
    /// Create a logger from general config. Returns `None` when logging is
    /// not configured or the log file cannot be opened.
    #[must_use]
    pub fn from_config(general: &GeneralConfig) -> Option<Self> {
        let path = expand_tilde(general.log_file.as_deref()?);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            format: general.log_format,
        })
    }

    /// Write one entry, flushing immediately so short-lived hook processes
    /// never lose the record.
    pub fn log(&self, entry: &LogEntry) {
        let line = match self.format {
            LogFormat::Text => entry.format_text(),
            LogFormat::Json => entry.format_json(),
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.write_all(line.as_bytes());
            let _ = writer.flush();
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
