use crossbeam_channel::{Receiver, Sender, unbounded};

/// Concurrent FIFO with a single consumer.
///
/// Producers hold cloneable [`CommandSender`]s; the queue value itself stays
/// with the consumer, and `drain` taking `&mut self` keeps it that way.
#[derive(Debug)]
pub struct CommandQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

/// Cloneable producer handle. Safe to use from any thread; `enqueue` never
/// blocks.
#[derive(Debug)]
pub struct CommandSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for CommandSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> CommandSender<T> {
    /// Append an item to the queue. Returns `false` if the consumer side has
    /// been dropped (the item is discarded in that case).
    pub fn enqueue(&self, item: T) -> bool {
        self.tx.send(item).is_ok()
    }
}

impl<T> CommandQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Create a new producer handle.
    pub fn sender(&self) -> CommandSender<T> {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Number of items currently waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Remove and return every item present at the moment of the call, in
    /// arrival order. Items enqueued concurrently with the drain are left
    /// for the next call.
    pub fn drain(&mut self) -> Vec<T> {
        // Snapshot the length first so a producer racing with the drain
        // cannot extend this batch.
        let pending = self.rx.len();
        let mut items = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(item) => items.push(item),
                // Only this consumer pops, so the snapshot count is a lower
                // bound; an empty channel here is unreachable.
                Err(_) => break,
            }
        }
        if !items.is_empty() {
            tracing::trace!(batch = items.len(), "drained command batch");
        }
        items
    }
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
