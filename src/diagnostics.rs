// src/diagnostics.rs
//
// Append-only diagnostic log of lifecycle and data events.
// Entries are kept in memory for an optional overlay and mirrored to the
// console through `tlog!`. There is no eviction; a caller displaying the
// log may cap what it renders.

use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
}

/// One immutable log line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Positional identifier, `log-<n>` with n starting at 0
    pub id: String,
    pub level: LogLevel,
    pub content: String,
}

/// Shared handle to the diagnostic log. Clones append to the same sequence.
#[derive(Clone, Default)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an info-level line.
    pub fn append(&self, line: impl Into<String>) {
        self.push(LogLevel::Info, line.into());
    }

    /// Append a warning-level line.
    pub fn warn(&self, line: impl Into<String>) {
        self.push(LogLevel::Warn, line.into());
    }

    fn push(&self, level: LogLevel, content: String) {
        match level {
            LogLevel::Info => tlog!("[ipc] {}", content),
            LogLevel::Warn => tlog!("[ipc] WARNING: {}", content),
        }

        // Entries are push-only, so a poisoned Vec is still consistent
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = format!("log-{}", entries.len());
        entries.push(LogEntry { id, level, content });
    }

    /// Snapshot of all entries in append order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of warning-level entries
    pub fn warning_count(&self) -> usize {
        self.entries
            .lock()
            .map(|e| e.iter().filter(|entry| entry.level == LogLevel::Warn).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_positional() {
        let log = DiagnosticLog::new();
        log.append("first");
        log.warn("second");
        log.append("third");

        let entries = log.entries();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["log-0", "log-1", "log-2"]);
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[2].content, "third");
    }

    #[test]
    fn test_clones_share_sequence() {
        let log = DiagnosticLog::new();
        let other = log.clone();
        log.append("a");
        other.append("b");
        assert_eq!(log.len(), 2);
        assert_eq!(other.entries()[1].id, "log-1");
    }

    #[test]
    fn test_warning_count() {
        let log = DiagnosticLog::new();
        assert!(log.is_empty());
        log.append("ok");
        log.warn("bad");
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_serializes_lowercase_level() {
        let entry = LogEntry {
            id: "log-0".to_string(),
            level: LogLevel::Warn,
            content: "x".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "warn");
    }
}
