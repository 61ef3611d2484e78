//! Formatter implementations for outbound log lines.
//!
//! Provides the core [`Formatter`] trait alongside the two built-in
//! implementations: a timestamped plain-text rendering and a flat JSON
//! document suitable for structured collectors.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

use crate::log_record::LogRecord;

/// Trait for formatting log records into single-line strings.
///
/// Implementors must be thread-safe (`Send + Sync`) so an appender holding
/// one can be shared across producer threads.
pub trait Formatter: Send + Sync {
    /// Format a log record into a string representation.
    fn format(&self, record: &LogRecord) -> String;
}

/// Default plain-text formatter: `"<timestamp> : <LEVEL>, <message>"`.
#[derive(Copy, Clone, Debug, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let timestamp: DateTime<Local> = record.metadata.timestamp.into();
        format!(
            "{} : {}, {}",
            timestamp.format("%a %b %d %H:%M:%S %Y"),
            record.level,
            record.message
        )
    }
}

/// Top-level keys owned by the formatter; extra fields may not override them.
const RESERVED_FIELDS: &[&str] = &[
    "message",
    "host",
    "path",
    "levelname",
    "logger",
    "exc_info",
    "lineno",
    "process",
    "processName",
    "threadName",
];

/// Formatter emitting one flat JSON document per record.
///
/// The originating hostname is captured once at construction and reused for
/// every record.
#[derive(Clone, Debug)]
pub struct JsonFormatter {
    host: String,
}

impl JsonFormatter {
    /// Create a formatter reporting the local machine's hostname.
    pub fn new() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_owned());
        Self { host }
    }

    /// Create a formatter reporting a fixed hostname.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut doc = Map::new();
        doc.insert("message".into(), Value::String(record.message.clone()));
        doc.insert("host".into(), Value::String(self.host.clone()));
        doc.insert(
            "path".into(),
            Value::String(record.metadata.filename.clone()),
        );
        doc.insert("levelname".into(), Value::String(record.level.to_string()));
        doc.insert("logger".into(), Value::String(record.logger.clone()));

        for (key, value) in &record.metadata.extras {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            doc.insert(key.clone(), value);
        }

        if let Some(exception) = &record.metadata.exception {
            doc.insert("exc_info".into(), Value::String(exception.clone()));
            doc.insert("lineno".into(), Value::from(record.metadata.line_number));
            doc.insert("process".into(), Value::from(record.metadata.process_id));
            if let Some(name) = &record.metadata.process_name {
                doc.insert("processName".into(), Value::String(name.clone()));
            }
            if let Some(name) = &record.metadata.thread_name {
                doc.insert("threadName".into(), Value::String(name.clone()));
            }
        }

        Value::Object(doc).to_string()
    }
}
