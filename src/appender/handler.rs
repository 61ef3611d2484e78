//! Public appender type exported by the crate.

use std::{fmt, sync::Once, thread};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{info, warn};
use parking_lot::Mutex;

use crate::{
    formatter::{Formatter, TextFormatter},
    log_record::LogRecord,
    queue::{MessageDrain, MessageQueue, bounded_queue},
};

use super::{builder::token_looks_valid, config::AppenderConfig, worker::spawn_dispatcher};

/// Identifier transmitted ahead of the token on every fresh stream, so the
/// collector can recognise and authenticate the connection.
pub const LIBRARY_IDENTIFIER: &str = "###R01### - Library initialised";

/// Appender shipping formatted records to a remote collector over TCP.
///
/// Construction validates the access token. A rejected token degrades the
/// appender to a no-op sink: submissions are accepted and discarded, the
/// dispatcher never starts, no socket is ever opened, and a single
/// diagnostic is emitted. With a valid token, a priming line is queued at
/// construction and the dispatcher thread starts lazily, exactly once, on
/// the first submission.
pub struct SocketAppender {
    token: String,
    formatter: Box<dyn Formatter>,
    delivery: Option<Delivery>,
}

/// Queue and dispatcher lifecycle state for a valid-token appender.
struct Delivery {
    queue: MessageQueue,
    start: Once,
    seed: Mutex<Option<DispatcherSeed>>,
    stop: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

/// Everything the dispatcher thread takes ownership of when it starts.
struct DispatcherSeed {
    drain: MessageDrain,
    stop: Receiver<()>,
    config: AppenderConfig,
}

impl SocketAppender {
    /// Construct an appender for `token` with default configuration.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let token_valid = token_looks_valid(&token);
        Self::from_parts(
            token,
            AppenderConfig::default(),
            Box::new(TextFormatter),
            token_valid,
        )
    }

    pub(crate) fn from_parts(
        token: String,
        config: AppenderConfig,
        formatter: Box<dyn Formatter>,
        token_valid: bool,
    ) -> Self {
        let delivery = if token_valid {
            let (queue, drain) = bounded_queue(config.capacity);
            let (stop_tx, stop_rx) = bounded(1);
            // The priming line must be the first line on the wire.
            queue.enqueue(format!("{LIBRARY_IDENTIFIER}{token}"));
            Some(Delivery {
                queue,
                start: Once::new(),
                seed: Mutex::new(Some(DispatcherSeed {
                    drain,
                    stop: stop_rx,
                    config,
                })),
                stop: Mutex::new(Some(stop_tx)),
                handle: Mutex::new(None),
            })
        } else {
            warn!(
                "logship: the supplied access token is not valid; \
                 records will be accepted but never shipped"
            );
            None
        };
        Self {
            token,
            formatter,
            delivery,
        }
    }

    /// Accept a fully formatted message for asynchronous delivery.
    ///
    /// The token is prefixed and the message queued; delivery failures are
    /// handled entirely by the dispatcher. Blocks while the queue is at
    /// capacity (backpressure) and never returns an error.
    pub fn submit(&self, formatted: &str) {
        let Some(delivery) = &self.delivery else {
            return;
        };
        delivery.ensure_started();
        let message = formatted.trim_end_matches('\n');
        delivery.queue.enqueue(format!("{}{}", self.token, message));
    }

    /// Format `record` with the configured formatter, then submit it.
    pub fn emit(&self, record: &LogRecord) {
        self.submit(&self.formatter.format(record));
    }

    /// Whether the dispatcher thread has been started.
    pub fn is_running(&self) -> bool {
        self.delivery
            .as_ref()
            .is_some_and(|delivery| delivery.handle.lock().is_some())
    }

    /// Stop the dispatcher and wait for it to exit. Idempotent.
    ///
    /// Every blocking point in the dispatcher observes the stop signal, so
    /// close returns promptly even mid-reconnect.
    pub fn close(&mut self) {
        let Some(delivery) = &self.delivery else {
            return;
        };
        delivery.request_stop();
        delivery.join();
    }
}

impl Delivery {
    /// Start the dispatcher exactly once, racing first submissions safely.
    fn ensure_started(&self) {
        self.start.call_once(|| {
            if let Some(seed) = self.seed.lock().take() {
                info!("logship: starting asynchronous dispatcher");
                let handle = spawn_dispatcher(seed.drain, seed.stop, seed.config);
                *self.handle.lock() = Some(handle);
            }
        });
    }

    fn request_stop(&self) {
        let Some(stop) = self.stop.lock().take() else {
            return;
        };
        let _ = stop.send(());
    }

    fn join(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("logship: dispatcher thread panicked");
        }
    }
}

impl Drop for SocketAppender {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SocketAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketAppender")
            .field("running", &self.is_running())
            .field("degraded", &self.delivery.is_none())
            .finish()
    }
}
