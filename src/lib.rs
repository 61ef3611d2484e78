//! Asynchronous log shipping over a persistent TCP connection.
//!
//! Records are formatted into single text lines, buffered in a bounded
//! in-memory queue, and drained by one background dispatcher thread that
//! owns the socket, reconnects with jittered exponential backoff, and
//! retries failed sends without dropping messages. Producers never receive
//! delivery errors: a full queue blocks the caller (backpressure) and every
//! other failure is handled inside the dispatcher.
//!
//! ```no_run
//! use logship::{Level, LogRecord, SocketAppenderBuilder};
//!
//! let appender = SocketAppenderBuilder::new("2bfbea1e-10c3-4419-bdad-7e6435882e1f")
//!     .with_endpoint("collector.internal", 10_000)
//!     .build()
//!     .expect("valid configuration");
//!
//! appender.emit(&LogRecord::new("app", Level::Info, "service started"));
//! ```

mod appender;
mod formatter;
mod level;
mod log_record;
mod queue;

pub use appender::{
    AppenderConfig, BackoffPolicy, BuildError, DEFAULT_HOST, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY,
    DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, LIBRARY_IDENTIFIER, LINE_SEP, SocketAppender,
    SocketAppenderBuilder, SocketTransport, TcpTransport, TlsOptions, TokenValidator,
};
pub use formatter::{Formatter, JsonFormatter, TextFormatter};
pub use level::Level;
pub use log_record::{ExtraValue, LogRecord, RecordMetadata};

#[cfg(feature = "test-util")]
pub use appender::MockTransport;
