//! Asynchronous TCP appender implementation.
//!
//! This module defines [`SocketAppender`], the producer-facing handle over a
//! bounded message queue drained by a single background dispatcher thread.
//! The dispatcher owns the network connection, frames each message as one
//! newline-terminated line, transparently reconnects using jittered
//! exponential backoff, and retries a failed send with the same message
//! until it is transmitted.

pub(crate) mod backoff;
mod builder;
mod config;
mod framing;
mod handler;
pub(crate) mod transport;
mod worker;

#[cfg(test)]
mod tests;

pub use builder::{BuildError, SocketAppenderBuilder, TokenValidator};
pub use config::{
    AppenderConfig, BackoffPolicy, DEFAULT_HOST, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY,
    DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY,
};
pub use framing::LINE_SEP;
pub use handler::{LIBRARY_IDENTIFIER, SocketAppender};
pub use transport::{SocketTransport, TcpTransport, TlsOptions};

#[cfg(any(test, feature = "test-util"))]
pub use transport::mock::MockTransport;
