//! Bounded many-writer, single-reader FIFO with a drop-oldest overflow policy.
//!
//! Producers never wait on a full queue: admitting a new item evicts the
//! oldest queued one. Delivery is therefore best-effort, but the order of
//! whatever survives is the order it was enqueued.
//!
//! Queue depth accounting is done where the queue changes: enqueue
//! increments and eviction decrements inside the queue lock. The consumer
//! decrements after each receive; [`Receiver::drain`] decrements per
//! discarded item.

use crate::error::ChannelClosed;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tickersim_stats::StatAggregator;
use tokio::sync::Notify;
use tracing::trace;

/// Default capacity of the aggregation channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 15_000;

/// Sink for queue-depth accounting.
pub trait QueueDepth: Send + Sync {
    fn increment(&self);
    fn decrement(&self);
}

impl QueueDepth for StatAggregator {
    fn increment(&self) {
        self.increment_queue_depth();
    }

    fn decrement(&self) {
        self.decrement_queue_depth();
    }
}

/// Result of a successful send.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery<T> {
    /// Queued without displacing anything.
    Queued,
    /// Queued; the returned oldest item was evicted to make room.
    QueuedEvicting(T),
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    /// Wakes the single receiver. `notify_one` keeps a permit when nobody is
    /// waiting, so a send racing the receiver's check is not lost.
    notify: Notify,
    capacity: usize,
    depth: Arc<dyn QueueDepth>,
}

/// Create an aggregation channel holding at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn aggregation_channel<T>(
    capacity: usize,
    depth: Arc<dyn QueueDepth>,
) -> (Sender<T>, Receiver<T>) {
    assert!(capacity > 0, "aggregation channel capacity must be non-zero");
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            items: VecDeque::with_capacity(capacity.min(1024)),
            closed: false,
        }),
        notify: Notify::new(),
        capacity,
        depth,
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

/// Writer half. Cheap to clone; every producer gets one.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Sender<T> {
    /// Enqueue `item`, evicting the oldest item if the queue is full.
    ///
    /// Never waits. Fails only once the channel has been closed.
    pub fn send(&self, item: T) -> Result<Delivery<T>, ChannelClosed<T>> {
        let delivery = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(ChannelClosed(item));
            }

            let evicted = if state.items.len() >= self.shared.capacity {
                let oldest = state.items.pop_front();
                if oldest.is_some() {
                    self.shared.depth.decrement();
                }
                oldest
            } else {
                None
            };

            state.items.push_back(item);
            self.shared.depth.increment();

            match evicted {
                Some(old) => Delivery::QueuedEvicting(old),
                None => Delivery::Queued,
            }
        };

        if matches!(delivery, Delivery::QueuedEvicting(_)) {
            trace!("Aggregation channel full, evicted oldest update");
        }
        self.shared.notify.notify_one();
        Ok(delivery)
    }

    /// Close the channel. The receiver drains what is left, then sees `None`.
    pub fn close(&self) {
        self.shared.close();
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

/// Reader half. Exactly one exists per channel.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Wait for the next item in FIFO order.
    ///
    /// Returns `None` once the channel is closed and empty. Cancel-safe: an
    /// item is only removed from the queue by the poll that returns it.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            {
                let mut state = self.shared.state.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the next item without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.shared.state.lock().items.pop_front()
    }

    /// Discard everything queued, keeping the depth counter in step.
    /// Returns the number of items dropped.
    pub fn drain(&mut self) -> usize {
        let dropped: Vec<T> = self.shared.state.lock().items.drain(..).collect();
        for _ in &dropped {
            self.shared.depth.decrement();
        }
        dropped.len()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed capacity of this channel.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Close the channel from the reading side.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl<T> Shared<T> {
    fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge(AtomicI64);

    impl QueueDepth for Gauge {
        fn increment(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn decrement(&self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Gauge {
        fn get(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn channel(capacity: usize) -> (Sender<&'static str>, Receiver<&'static str>, Arc<Gauge>) {
        let gauge = Arc::new(Gauge::default());
        let (tx, rx) = aggregation_channel(capacity, gauge.clone());
        (tx, rx, gauge)
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let (tx, mut rx, gauge) = channel(3);

        assert_eq!(tx.send("A"), Ok(Delivery::Queued));
        assert_eq!(tx.send("B"), Ok(Delivery::Queued));
        assert_eq!(tx.send("C"), Ok(Delivery::Queued));
        assert_eq!(tx.send("D"), Ok(Delivery::QueuedEvicting("A")));

        assert_eq!(gauge.get(), 3);
        assert_eq!(rx.try_recv(), Some("B"));
        assert_eq!(rx.try_recv(), Some("C"));
        assert_eq!(rx.try_recv(), Some("D"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_depth_tracks_items_under_overflow() {
        let (tx, rx, gauge) = channel(5);
        for i in 0..50 {
            let _ = tx.send(if i % 2 == 0 { "even" } else { "odd" });
            assert_eq!(gauge.get() as usize, rx.len());
        }
        assert_eq!(rx.len(), 5);
    }

    #[test]
    fn test_drain_decrements_depth() {
        let (tx, mut rx, gauge) = channel(10);
        for _ in 0..4 {
            tx.send("x").unwrap();
        }
        assert_eq!(rx.drain(), 4);
        assert_eq!(gauge.get(), 0);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_send_after_close_fails() {
        let (tx, _rx, gauge) = channel(2);
        tx.close();
        assert_eq!(tx.send("late"), Err(ChannelClosed("late")));
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_recv_waits_for_send() {
        let (tx, mut rx, _gauge) = channel(4);

        let reader = tokio::spawn(async move { rx.recv().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send("hello").unwrap();

        assert_eq!(reader.await.unwrap(), Some("hello"));
    }

    #[tokio::test]
    async fn test_close_releases_waiting_receiver() {
        let (tx, mut rx, _gauge) = channel(4);

        let reader = tokio::spawn(async move { rx.recv().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.close();

        assert_eq!(reader.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closed_channel_delivers_remaining_items_first() {
        let (tx, mut rx, _gauge) = channel(4);
        tx.send("one").unwrap();
        tx.send("two").unwrap();
        tx.close();

        assert_eq!(rx.recv().await, Some("one"));
        assert_eq!(rx.recv().await, Some("two"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_writers_one_reader() {
        let gauge = Arc::new(Gauge::default());
        let (tx, mut rx) = aggregation_channel::<u32>(100_000, gauge.clone());

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for i in 0..500 {
                        tx.send(w * 1_000 + i).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap();
        }

        let mut received = 0;
        while rx.try_recv().is_some() {
            received += 1;
            gauge.decrement();
        }
        assert_eq!(received, 4_000);
        assert_eq!(gauge.get(), 0);
    }
}
