//! Ordered hand-off of captured output from capture tasks to one consumer.
//!
//! Readers push from arbitrary tokio tasks; the consumer either drains on its
//! own poll tick or awaits [`OutputRelay::notified`]. Pushing never blocks and
//! the queue is unbounded: a foreground command's output is bounded by its
//! lifetime and a slow consumer must never stall the child's pipes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// One unit of captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// A line including its terminator, or a final partial line.
    pub text: String,
    /// Whether the text came from the child's stderr.
    pub is_error: bool,
}

impl Chunk {
    pub fn new(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            text: text.into(),
            is_error,
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: Mutex<VecDeque<Chunk>>,
    notify: Notify,
}

/// Multi-producer, single-consumer chunk queue. Cloning shares the queue.
#[derive(Debug, Clone, Default)]
pub struct OutputRelay {
    inner: Arc<Inner>,
}

impl OutputRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and wake the consumer.
    pub fn push(&self, chunk: Chunk) {
        self.queue().push_back(chunk);
        self.inner.notify.notify_one();
    }

    /// Remove and return every queued chunk in insertion order.
    pub fn drain_all(&self) -> Vec<Chunk> {
        self.queue().drain(..).collect()
    }

    /// Wait until at least one push happened since the last wake-up.
    ///
    /// A push with no waiter stores a permit, so a push that races ahead of
    /// this call is not lost.
    pub async fn notified(&self) {
        self.inner.notify.notified().await;
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    // A panicking producer cannot leave a half-written VecDeque behind, so a
    // poisoned lock still guards consistent data.
    fn queue(&self) -> MutexGuard<'_, VecDeque<Chunk>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
