//! Cross-thread deferred execution: a concurrent FIFO drained by exactly one
//! consumer, plus one-shot completion handles for value-returning work.
//!
//! # Invariants
//! - An enqueued item is executed exactly once, only by the consumer, in
//!   FIFO order relative to items enqueued before the same drain call.
//! - Items enqueued while a drain is in progress wait for the next drain.
//! - No cancellation: once enqueued, an item is always delivered.

mod completion;
mod queue;

pub use completion::{Completer, CompletionHandle, completion};
pub use queue::{CommandQueue, CommandSender};

/// Errors observed by completion waiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The completer was dropped without fulfilling the handle. The consumer
    /// loop has died or discarded the work; a liveness fault, not a normal
    /// result.
    #[error("completion abandoned: consumer stalled or gone")]
    Stalled,
    /// `wait_timeout` expired before the completion arrived.
    #[error("timed out waiting for completion")]
    TimedOut,
}

pub fn crate_info() -> &'static str {
    "gridhost-queue v0.1.0"
}
