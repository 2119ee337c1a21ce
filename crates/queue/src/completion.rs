use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::time::Duration;

use crate::QueueError;

/// Create a one-shot completion pair.
///
/// The [`Completer`] travels with the enqueued work and is fulfilled by the
/// consumer; the [`CompletionHandle`] stays with the producer, which may
/// block on it without ever blocking the consumer.
pub fn completion<T>() -> (Completer<T>, CompletionHandle<T>) {
    let (tx, rx) = bounded(1);
    (Completer { tx }, CompletionHandle { rx })
}

/// Fulfilling side of a one-shot completion. Consumed on use; dropping it
/// unfulfilled signals [`QueueError::Stalled`] to the waiter.
#[derive(Debug)]
pub struct Completer<T> {
    tx: Sender<T>,
}

impl<T> Completer<T> {
    /// Deliver the result. Returns `false` if the waiter gave up and dropped
    /// its handle; the value is discarded in that case.
    pub fn complete(self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Waiting side of a one-shot completion.
#[derive(Debug)]
pub struct CompletionHandle<T> {
    rx: Receiver<T>,
}

impl<T> CompletionHandle<T> {
    /// Block until the result arrives. Blocks only the calling thread.
    pub fn wait(self) -> Result<T, QueueError> {
        self.rx.recv().map_err(|_| QueueError::Stalled)
    }

    /// Block up to `timeout` for the result.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, QueueError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => QueueError::TimedOut,
            RecvTimeoutError::Disconnected => QueueError::Stalled,
        })
    }

    /// Non-blocking probe. `Ok(None)` means "not ready yet".
    pub fn try_wait(&self) -> Result<Option<T>, QueueError> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => Err(QueueError::Stalled),
        }
    }
}
