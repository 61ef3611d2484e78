//! Configuration consumed by the appender runtime.
//!
//! [`SocketAppenderBuilder`](super::SocketAppenderBuilder) constructs these
//! values before handing them to the dispatcher thread.

use std::time::Duration;

use super::transport::{SocketTransport, TcpTransport};

/// Default bounded queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32_768;
/// Default connection timeout applied when establishing sockets.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default write timeout applied to socket writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default minimum delay between reconnection attempts.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);
/// Default maximum delay between reconnection attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
/// Default collector host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default collector port.
pub const DEFAULT_PORT: u16 = 10_000;

/// Runtime configuration for a [`SocketAppender`](super::SocketAppender).
#[derive(Clone, Debug)]
pub struct AppenderConfig {
    pub capacity: usize,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub transport: SocketTransport,
    pub backoff: BackoffPolicy,
}

/// Provide defaults that favour local development whilst encouraging
/// production callers to point the builder at their collector endpoint.
impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            transport: SocketTransport::Tcp(TcpTransport {
                host: DEFAULT_HOST.into(),
                port: DEFAULT_PORT,
                tls: None,
            }),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Exponential backoff policy for reconnection attempts.
///
/// The delay doubles on every failed attempt, is capped at `max`, and resets
/// to `min` after any successful connect. There is no retry limit: the
/// dispatcher keeps attempting for as long as the process lives.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}
