//! Log record representation shared by formatters and the appender.
//!
//! This module defines the `LogRecord` struct that captures log events along
//! with their contextual metadata such as timestamps, source location, and
//! process/thread information.

use std::collections::BTreeMap;
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::SystemTime;

use serde::Serialize;

use crate::level::Level;

/// JSON-safe primitive accepted in a record's extra-field map.
///
/// The closed set replaces free-form attribute scraping: callers attach
/// primitives directly and push anything else through [`ExtraValue::stringify`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ExtraValue {
    /// Render a value outside the closed set through its `Display` impl.
    pub fn stringify(value: impl fmt::Display) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Additional context associated with a log record.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// Time the record was created.
    pub timestamp: SystemTime,
    /// ID of the process that created the record.
    pub process_id: u32,
    /// Name of the process (if known).
    pub process_name: Option<String>,
    /// ID of the thread that created the record.
    pub thread_id: ThreadId,
    /// Name of the thread that created the record (if any).
    pub thread_name: Option<String>,
    /// Caller-supplied structured fields outside the reserved set.
    pub extras: BTreeMap<String, ExtraValue>,
    /// Rendered stack trace when an error context is present.
    pub exception: Option<String>,
}

impl RecordMetadata {
    /// Capture timestamp and thread info from the current execution context.
    fn capture_runtime() -> (SystemTime, ThreadId, Option<String>) {
        let current = thread::current();
        (
            SystemTime::now(),
            current.id(),
            current.name().map(ToString::to_string),
        )
    }
}

impl Default for RecordMetadata {
    fn default() -> Self {
        let (timestamp, thread_id, thread_name) = Self::capture_runtime();
        Self {
            filename: String::new(),
            line_number: 0,
            timestamp,
            process_id: std::process::id(),
            process_name: None,
            thread_id,
            thread_name,
            extras: BTreeMap::new(),
            exception: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Name of the logger that created this record.
    pub logger: String,
    /// Severity of the record.
    pub level: Level,
    /// The log message content.
    pub message: String,
    /// Contextual metadata for the record.
    pub metadata: RecordMetadata,
}

impl LogRecord {
    /// Construct a new log record from logger `name`, `level`, and `message`.
    pub fn new(logger: &str, level: Level, message: &str) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            metadata: RecordMetadata::default(),
        }
    }

    /// Construct a log record with explicit source location and extras.
    pub fn with_metadata(
        logger: &str,
        level: Level,
        message: &str,
        mut metadata: RecordMetadata,
    ) -> Self {
        let (timestamp, thread_id, thread_name) = RecordMetadata::capture_runtime();
        metadata.timestamp = timestamp;
        metadata.thread_id = thread_id;
        metadata.thread_name = thread_name;
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            metadata,
        }
    }

    /// Attach an extra field, replacing any previous value for `key`.
    pub fn with_extra(mut self, key: &str, value: impl Into<ExtraValue>) -> Self {
        self.metadata.extras.insert(key.to_owned(), value.into());
        self
    }

    /// Attach a rendered stack trace.
    pub fn with_exception(mut self, rendered: impl Into<String>) -> Self {
        self.metadata.exception = Some(rendered.into());
        self
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
