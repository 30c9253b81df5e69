use crate::domain::logging::{LogEntry, LogLevel, Logger, TimeProvider};
use std::sync::Mutex;

/// Logger writing to the browser console
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    pub fn new_production() -> Self {
        Self::new(LogLevel::Info)
    }

    pub fn new_development() -> Self {
        Self::new(LogLevel::Debug)
    }

    pub fn format_entry(entry: &LogEntry) -> String {
        match &entry.metadata {
            Some(metadata) => format!(
                "[{}] {} {} | {} | {}",
                entry.timestamp, entry.level, entry.component, entry.message, metadata
            ),
            None => format!(
                "[{}] {} {} | {}",
                entry.timestamp, entry.level, entry.component, entry.message
            ),
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let line: wasm_bindgen::JsValue = Self::format_entry(&entry).into();
        match entry.level {
            LogLevel::Trace | LogLevel::Debug => web_sys::console::debug_1(&line),
            LogLevel::Info => web_sys::console::info_1(&line),
            LogLevel::Warn => web_sys::console::warn_1(&line),
            LogLevel::Error => web_sys::console::error_1(&line),
        }
    }
}

/// `Date.now()` clock
#[derive(Debug, Default)]
pub struct BrowserTimeProvider;

impl BrowserTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for BrowserTimeProvider {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Keeps entries in memory; for native hosts and tests
#[derive(Default)]
pub struct MemoryLogger {
    min_level: Option<LogLevel>,
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level: Some(min_level), entries: Mutex::new(Vec::new()) }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn log(&self, entry: LogEntry) {
        if self.min_level.is_some_and(|min| entry.level < min) {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::logging::LogComponent;

    #[test]
    fn memory_logger_filters_by_level() {
        let logger = MemoryLogger::new(LogLevel::Info);
        logger.debug(LogComponent::Domain("Test"), "hidden");
        logger.warn(LogComponent::Domain("Test"), "shown");
        assert!(!logger.contains("hidden"));
        assert!(logger.contains("shown"));
    }

    #[test]
    fn console_format_includes_component() {
        let entry = LogEntry {
            timestamp: 7,
            level: LogLevel::Warn,
            component: LogComponent::Application("RenderBridge"),
            message: "dropped".to_string(),
            metadata: Some("{\"n\":1}".to_string()),
        };
        assert_eq!(
            ConsoleLogger::format_entry(&entry),
            "[7]  WARN APP:RenderBridge | dropped | {\"n\":1}"
        );
    }
}
