use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// What `push` does when the queue is full. Pushing never blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep what is queued, drop the incoming item.
    #[default]
    DropNewest,
    /// Evict the oldest queued item to make room.
    DropOldest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome<T> {
    Queued,
    /// The queue was full and the incoming item was dropped (`DropNewest`).
    Rejected(T),
    /// The queue was full and the oldest item was evicted (`DropOldest`).
    Evicted(T),
    Closed(T),
}

/// Bounded FIFO between the listener and the dispatcher.
///
/// Consumers wait on a [`Notify`] instead of spinning on an empty queue.
pub struct EventQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    notify: Notify,
    closed: AtomicBool,
}

impl<T> EventQueue<T> {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            capacity,
            policy,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn push(&self, item: T) -> PushOutcome<T> {
        if self.is_closed() {
            return PushOutcome::Closed(item);
        }

        let outcome = {
            let mut items = self.lock();
            if items.len() < self.capacity {
                items.push_back(item);
                PushOutcome::Queued
            } else {
                match self.policy {
                    OverflowPolicy::DropNewest => PushOutcome::Rejected(item),
                    OverflowPolicy::DropOldest => {
                        let evicted = items.pop_front();
                        items.push_back(item);
                        match evicted {
                            Some(old) => PushOutcome::Evicted(old),
                            None => PushOutcome::Queued,
                        }
                    }
                }
            }
        };

        if !matches!(outcome, PushOutcome::Rejected(_)) {
            self.notify.notify_one();
        }
        outcome
    }

    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Oldest item, waiting while the queue is empty.
    /// Returns `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.is_closed() {
                return None;
            }
            notified.await;
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // 持鎖期間不會 panic, 中毒時仍可安全取回資料
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, OverflowPolicy::default())
    }
}
