//! Bounded FIFO buffer between producers and the dispatcher.
//!
//! Producers only ever touch the queue, never the connection, so the channel
//! is the sole synchronisation boundary in the crate. The queue applies
//! backpressure: a full buffer blocks the producer instead of dropping or
//! growing without bound.

use crossbeam_channel::{Receiver, Sender, bounded, select};

/// Producer half of the bounded message buffer.
///
/// Cloneable so any number of caller threads can enqueue concurrently.
#[derive(Clone, Debug)]
pub(crate) struct MessageQueue {
    tx: Sender<String>,
}

/// Consumer half, owned exclusively by the dispatcher thread.
#[derive(Debug)]
pub(crate) struct MessageDrain {
    rx: Receiver<String>,
}

/// Create a connected queue/drain pair holding at most `capacity` lines.
pub(crate) fn bounded_queue(capacity: usize) -> (MessageQueue, MessageDrain) {
    let (tx, rx) = bounded(capacity);
    (MessageQueue { tx }, MessageDrain { rx })
}

impl MessageQueue {
    /// Insert a line at the tail, blocking while the queue is at capacity.
    ///
    /// Cannot fail from the producer's point of view: once the dispatcher has
    /// exited the line is silently discarded, matching the appender's
    /// degrade-to-sink behaviour after shutdown.
    pub(crate) fn enqueue(&self, line: String) {
        let _ = self.tx.send(line);
    }
}

impl MessageDrain {
    /// Blocking pop from the head, observing the stop signal.
    ///
    /// Returns `None` when the stop signal fires (or its sender is dropped),
    /// or once every producer handle is gone and the buffer is empty.
    pub(crate) fn dequeue(&self, stop: &Receiver<()>) -> Option<String> {
        select! {
            recv(self.rx) -> line => line.ok(),
            recv(stop) -> _ => None,
        }
    }
}
