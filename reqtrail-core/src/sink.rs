//! Log sinks
//!
//! The recorder never writes anywhere itself; every record, warning and
//! error goes through a [`LogSink`]. Sinks are synchronous and must not
//! block for long: they run inline with request processing.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Severity of a sink entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Structured log destination
pub trait LogSink: Send + Sync {
    /// Emit an informational entry
    fn info(&self, message: &str, category: &str, context: &Value);

    /// Emit a warning
    fn warn(&self, message: &str, category: &str, context: &Value);

    /// Emit an error
    fn error(&self, message: &str, category: &str, context: &Value);

    /// Emit an entry at `level`
    fn log(&self, level: LogLevel, message: &str, category: &str, context: &Value) {
        match level {
            LogLevel::Info => self.info(message, category, context),
            LogLevel::Warn => self.warn(message, category, context),
            LogLevel::Error => self.error(message, category, context),
        }
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn info(&self, message: &str, category: &str, context: &Value) {
        (**self).info(message, category, context)
    }

    fn warn(&self, message: &str, category: &str, context: &Value) {
        (**self).warn(message, category, context)
    }

    fn error(&self, message: &str, category: &str, context: &Value) {
        (**self).error(message, category, context)
    }
}

/// Sink forwarding entries to `tracing` events
///
/// The context is attached as a JSON-rendered `context` field, the category
/// as a `category` field. Install a subscriber (see `reqtrail-log`) to
/// route them somewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn info(&self, message: &str, category: &str, context: &Value) {
        tracing::info!(target: "reqtrail", category, context = %context, "{}", message);
    }

    fn warn(&self, message: &str, category: &str, context: &Value) {
        tracing::warn!(target: "reqtrail", category, context = %context, "{}", message);
    }

    fn error(&self, message: &str, category: &str, context: &Value) {
        tracing::error!(target: "reqtrail", category, context = %context, "{}", message);
    }
}

/// Entry captured by a [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub category: String,
    pub context: Value,
}

/// Memory sink for testing
///
/// Stores entries in memory. Clones share the same buffer.
///
/// # Examples
///
/// ```
/// use reqtrail_core::{LogLevel, LogSink, MemorySink};
///
/// let sink = MemorySink::new();
/// sink.info("Incoming request", "requestResponseData", &serde_json::json!({}));
///
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.entries()[0].level, LogLevel::Info);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Entries at a given level, oldest first
    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level == level)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, level: LogLevel, message: &str, category: &str, context: &Value) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            category: category.to_string(),
            context: context.clone(),
        });
    }
}

impl LogSink for MemorySink {
    fn info(&self, message: &str, category: &str, context: &Value) {
        self.push(LogLevel::Info, message, category, context);
    }

    fn warn(&self, message: &str, category: &str, context: &Value) {
        self.push(LogLevel::Warn, message, category, context);
    }

    fn error(&self, message: &str, category: &str, context: &Value) {
        self.push(LogLevel::Error, message, category, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_sink_records_levels() {
        let sink = MemorySink::new();
        sink.info("a", "cat", &json!({"x": 1}));
        sink.warn("b", "cat", &json!(null));
        sink.log(LogLevel::Error, "c", "other", &json!([]));

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].context, json!({"x": 1}));
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[2].level, LogLevel::Error);
        assert_eq!(entries[2].category, "other");
    }

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let shared: Arc<dyn LogSink> = Arc::new(sink.clone());

        shared.info("hello", "cat", &json!({}));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries_at(LogLevel::Info).len(), 1);
        assert!(sink.entries_at(LogLevel::Warn).is_empty());

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        let sink = TracingSink::new();
        sink.info("Incoming request", "requestResponseData", &json!({"phase": "request-start"}));
        sink.error("failed", "handler", &json!({}));
    }
}
