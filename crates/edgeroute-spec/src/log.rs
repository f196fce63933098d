//! Logging seam for the build pipeline.
//!
//! Messages travel on two channels: `system` diagnostics meant for whoever
//! operates the build, and `user` messages meant for the project author. User
//! messages are forwarded verbatim (a function's own `console.log` output
//! goes through this channel unmodified).

use std::sync::Mutex;

/// Sink for pipeline log messages.
pub trait Logger: Send + Sync {
    /// Logs a diagnostic for the build system only.
    fn system(&self, message: &str);

    /// Logs a message shown to the project author.
    fn user(&self, message: &str);
}

/// Logger that forwards both channels to `tracing`.
///
/// User messages are emitted at `warn` so the default filter keeps them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn system(&self, message: &str) {
        tracing::debug!(target: "edgeroute::system", "{}", message);
    }

    fn user(&self, message: &str) {
        tracing::warn!(target: "edgeroute::user", "{}", message);
    }
}

/// The channel a message was logged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    System,
    User,
}

/// A single recorded log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub channel: LogChannel,
    pub message: String,
}

/// Logger that records every message in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Returns the messages logged on the user channel.
    pub fn user_messages(&self) -> Vec<String> {
        self.messages(LogChannel::User)
    }

    /// Returns the messages logged on the system channel.
    pub fn system_messages(&self) -> Vec<String> {
        self.messages(LogChannel::System)
    }

    fn messages(&self, channel: LogChannel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|entry| entry.channel == channel)
            .map(|entry| entry.message.clone())
            .collect()
    }

    fn record(&self, channel: LogChannel, message: &str) {
        self.lock().push(LogEntry {
            channel,
            message: message.to_string(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Logger for MemoryLogger {
    fn system(&self, message: &str) {
        self.record(LogChannel::System, message);
    }

    fn user(&self, message: &str) {
        self.record(LogChannel::User, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_separates_channels() {
        let logger = MemoryLogger::new();
        logger.system("downloading runtime");
        logger.user("hello from func-1\n");
        logger.system("using cached runtime");

        assert_eq!(
            logger.system_messages(),
            vec!["downloading runtime", "using cached runtime"]
        );
        assert_eq!(logger.user_messages(), vec!["hello from func-1\n"]);
        assert_eq!(logger.entries().len(), 3);
    }
}
