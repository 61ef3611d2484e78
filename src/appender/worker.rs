//! Dispatcher thread owning the connection lifecycle.
//!
//! Exactly one dispatcher runs per appender. It drains the bounded queue,
//! frames each line, and writes it on the current connection, reconnecting
//! with jittered exponential backoff whenever a connect or send fails. A
//! failed send is retried with the same message until it is transmitted;
//! nothing is dropped on a transient failure.

use std::{io, thread};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, warn};

use crate::queue::MessageDrain;

use super::{
    backoff::BackoffState,
    config::AppenderConfig,
    framing::frame_line,
    transport::{ActiveConnection, connect_transport},
};

/// Spawn the background dispatcher for `config`.
///
/// The thread exits when `stop` is signalled (or its sender dropped), or when
/// every producer handle on the queue is gone.
pub(crate) fn spawn_dispatcher(
    drain: MessageDrain,
    stop: Receiver<()>,
    config: AppenderConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || Dispatcher::new(config).run(drain, stop))
}

/// Background worker that owns the connection.
///
/// The lifecycle (disconnected, connecting, connected) is carried by the
/// `connection` option: `None` until a connect succeeds, `Some` while a
/// stream is live.
struct Dispatcher {
    config: AppenderConfig,
    connection: Option<ActiveConnection>,
    backoff: BackoffState,
}

impl Dispatcher {
    fn new(config: AppenderConfig) -> Self {
        let backoff = BackoffState::new(config.backoff.clone());
        Self {
            config,
            connection: None,
            backoff,
        }
    }

    fn run(mut self, drain: MessageDrain, stop: Receiver<()>) {
        if !self.reconnect(&stop) {
            return;
        }
        while let Some(line) = drain.dequeue(&stop) {
            if !self.transmit(&line, &stop) {
                break;
            }
        }
        self.disconnect();
    }

    /// Send one framed line, reconnecting until the write succeeds.
    ///
    /// Returns `false` only when cancelled; a transient failure never causes
    /// the line to be dropped.
    fn transmit(&mut self, line: &str, stop: &Receiver<()>) -> bool {
        let frame = frame_line(line);
        loop {
            match self.send(&frame) {
                Ok(()) => return true,
                Err(err) => {
                    warn!("logship dispatcher write failed: {err}");
                    if !self.reconnect(stop) {
                        return false;
                    }
                }
            }
        }
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let Some(conn) = self.connection.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no active connection",
            ));
        };
        conn.write_all(frame)?;
        conn.flush()
    }

    /// Open a fresh connection, resetting backoff on success.
    fn connect(&mut self) -> io::Result<()> {
        let mut stream = connect_transport(&self.config.transport, self.config.connect_timeout)?;
        stream.set_write_timeout(self.config.write_timeout)?;
        self.backoff.reset();
        self.connection = Some(stream);
        Ok(())
    }

    /// Drop the current connection. Idempotent; safe to call from any state.
    fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Close any existing connection, then retry connecting until one opens.
    ///
    /// Retries indefinitely under the backoff policy; the jittered sleep
    /// doubles as the cancellation point, so a stop signal aborts the loop
    /// instead of being swallowed. Returns `false` when cancelled.
    fn reconnect(&mut self, stop: &Receiver<()>) -> bool {
        self.disconnect();
        loop {
            if cancelled(stop) {
                return false;
            }
            match self.connect() {
                Ok(()) => return true,
                Err(err) => debug!("logship dispatcher unable to connect: {err}"),
            }
            let base = self.backoff.next_delay();
            match stop.recv_timeout(self.backoff.jitter(base)) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => return false,
            }
        }
    }
}

fn cancelled(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}
