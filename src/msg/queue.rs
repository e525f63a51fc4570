//! Bounded, lossy single-consumer queue.
//!
//! `send` never blocks: on a full queue the oldest element is evicted to
//! make room. Telemetry is refreshed every few seconds and commands are
//! rare, so losing the oldest entry is preferable to stalling a decoder.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

#[derive(Debug)]
struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
}

impl<T> Inner<T> {
    fn items(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create a queue holding at most `capacity` items (minimum 1)
pub fn lossy_channel<T>(capacity: usize) -> (LossySender<T>, LossyReceiver<T>) {
    let capacity = capacity.max(1);
    let inner = Arc::new(Inner {
        items: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
        notify: Notify::new(),
        closed: AtomicBool::new(false),
    });

    (
        LossySender { inner: inner.clone() },
        LossyReceiver { inner },
    )
}

/// Producer half
#[derive(Debug)]
pub struct LossySender<T> {
    inner: Arc<Inner<T>>,
}

impl<T> LossySender<T> {
    /// Enqueue `item`, returning how many old items were evicted
    pub fn send(&self, item: T) -> usize {
        let mut evicted = 0;
        {
            let mut items = self.inner.items();
            while items.len() >= self.inner.capacity {
                items.pop_front();
                evicted += 1;
            }
            items.push_back(item);
        }
        self.inner.notify.notify_one();
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl<T> Drop for LossySender<T> {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }
}

/// Consumer half
#[derive(Debug)]
pub struct LossyReceiver<T> {
    inner: Arc<Inner<T>>,
}

impl<T> LossyReceiver<T> {
    /// Wait for the next item; `None` once the sender is gone and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();

            if let Some(item) = self.inner.items().pop_front() {
                return Some(item);
            }
            if self.inner.closed.load(Ordering::SeqCst) {
                return None;
            }

            notified.await;
        }
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.inner.items().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
