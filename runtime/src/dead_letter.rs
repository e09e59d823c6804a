//! Bounded dead letter queue for deferred work that exhausted its retries.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Dead letter queue entry.
#[derive(Debug, Clone)]
pub struct DeadLetter<T> {
    /// The failed operation payload
    pub payload: T,

    /// Number of attempts made before giving up
    pub attempts: usize,

    /// The error message from the last failure
    pub error_message: String,

    /// When the entry was dead-lettered
    pub failed_at: DateTime<Utc>,
}

/// Dead Letter Queue for storing failed operations
///
/// Stores work that failed after exhausting retries so it can be inspected,
/// monitored and replayed by an operator.
///
/// - Bounded, oldest entries dropped when full
/// - Cheap to clone; clones share the same storage
///
/// # Example
///
/// ```
/// use exhibits_runtime::DeadLetterQueue;
///
/// let dlq = DeadLetterQueue::new(100);
/// dlq.push("republish:item:42".to_string(), "index unavailable".to_string(), 4);
/// assert_eq!(dlq.len(), 1);
///
/// for entry in dlq.drain() {
///     assert_eq!(entry.attempts, 4);
/// }
/// ```
#[derive(Debug)]
pub struct DeadLetterQueue<T> {
    queue: Arc<Mutex<VecDeque<DeadLetter<T>>>>,
    max_size: usize,
}

impl<T> DeadLetterQueue<T> {
    /// Create a new dead letter queue holding at most `max_size` entries.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size: max_size.max(1),
        }
    }

    /// Push a failed operation. If the queue is full, the oldest entry is dropped.
    pub fn push(&self, payload: T, error_message: String, attempts: usize) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        if queue.len() >= self.max_size {
            queue.pop_front();
            metrics::counter!("dlq_dropped_total").increment(1);
            tracing::warn!(max_size = self.max_size, "DLQ at capacity, dropping oldest entry");
        }

        queue.push_back(DeadLetter {
            payload,
            attempts,
            error_message,
            failed_at: Utc::now(),
        });

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("dlq_size").set(queue.len() as f64);
        metrics::counter!("dlq_pushed_total").increment(1);

        tracing::warn!(attempts, queue_size = queue.len(), "Operation added to dead letter queue");
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every entry, oldest first.
    pub fn drain(&self) -> Vec<DeadLetter<T>> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<_> = queue.drain(..).collect();

        metrics::gauge!("dlq_size").set(0.0);
        tracing::info!(count = entries.len(), "Drained dead letter queue");

        entries
    }

    /// Oldest entry, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<DeadLetter<T>>
    where
        T: Clone,
    {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .front()
            .cloned()
    }

    /// Capacity.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<T> Clone for DeadLetterQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            max_size: self.max_size,
        }
    }
}

impl<T> Default for DeadLetterQueue<T> {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_entry_dropped_at_capacity() {
        let dlq = DeadLetterQueue::new(2);
        dlq.push("a", "e1".to_string(), 1);
        dlq.push("b", "e2".to_string(), 1);
        dlq.push("c", "e3".to_string(), 1);

        assert_eq!(dlq.len(), 2);
        assert_eq!(dlq.peek().unwrap().payload, "b");
    }

    #[test]
    fn test_drain_empties_shared_storage() {
        let dlq = DeadLetterQueue::new(10);
        let view = dlq.clone();
        dlq.push(1, "boom".to_string(), 3);

        let drained = view.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].error_message, "boom");
        assert!(dlq.is_empty());
    }
}
