//! Real-time pipeline log streaming.
//!
//! The pipeline reports progress through a broadcast channel. Entries
//! are mirrored to stdout and streamed to any connected SSE client;
//! with no subscribers the send is a no-op, so the library path pays
//! nothing for it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Global log broadcaster.
pub static LOG_BUS: Lazy<LogBus> = Lazy::new(LogBus::new);

/// Fans log entries out to all connected SSE clients.
pub struct LogBus {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Publish an entry to stdout and every subscriber.
    pub fn publish(&self, entry: LogEntry) {
        let prefix = match entry.level {
            LogLevel::Info => "  ",
            LogLevel::Success => "ok",
            LogLevel::Warning => "!!",
            LogLevel::Error => "xx",
        };
        println!("{} {}", prefix, entry.message);

        // No receivers is fine; CLI runs have none.
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BUS.publish(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BUS.publish(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BUS.publish(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BUS.publish(LogEntry::new(LogLevel::Error, msg));
}
