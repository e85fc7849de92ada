//! Thread-safe accumulation of per-(worker, category) statistics.

use crate::memory::MemorySampler;
use crate::window::{jitter, peak_updates_per_second};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickersim_types::{Category, StatRecord, WorkerId};
use tokio::sync::watch;
use tracing::debug;

/// How long emission timestamps are retained for rate and jitter.
pub const RETENTION_WINDOW_MS: u64 = 10_000;

/// Published snapshot: an immutable, shareable list of records.
pub type StatSnapshot = Arc<Vec<StatRecord>>;

/// Accumulated state for one (worker, category) key.
#[derive(Debug, Default)]
struct KeyStats {
    count: u64,
    total_duration: Duration,
    /// Ascending emission times (ms since the aggregator epoch).
    timestamps: VecDeque<u64>,
}

impl KeyStats {
    fn record(&mut self, duration: Duration, now_ms: u64) {
        self.count += 1;
        self.total_duration += duration;
        self.timestamps.push_back(now_ms);

        let cutoff = now_ms.saturating_sub(RETENTION_WINDOW_MS);
        while self.timestamps.front().is_some_and(|&t| t < cutoff) {
            self.timestamps.pop_front();
        }
    }
}

/// Last observed execution state of a worker and how often it changed.
#[derive(Debug)]
struct WorkerStats {
    last_state: Category,
    transitions: u64,
}

/// Everything guarded by the aggregator's single lock.
#[derive(Debug, Default)]
struct Inner {
    /// Insertion-ordered so snapshots list keys in first-seen order.
    keys: IndexMap<(WorkerId, Category), KeyStats>,
    workers: HashMap<WorkerId, WorkerStats>,
    memory: MemorySampler,
}

/// Collects execution statistics from any number of concurrent producers.
///
/// Every mutation and the recomputation of the published snapshot happen
/// under one mutex, so readers observe either the state before or after a
/// `record_update`/`clear`, never a mix. The queue-depth counter lives
/// outside the lock as an atomic.
pub struct StatAggregator {
    inner: Mutex<Inner>,
    queue_depth: AtomicU64,
    epoch: Instant,
    snapshot_tx: watch::Sender<StatSnapshot>,
}

impl StatAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Mutex::new(Inner::default()),
            queue_depth: AtomicU64::new(0),
            epoch: Instant::now(),
            snapshot_tx,
        }
    }

    /// Milliseconds elapsed since this aggregator was created.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Record one update by `worker` in `category` that took `duration`.
    pub fn record_update(&self, worker: &WorkerId, category: Category, duration: Duration) {
        let now_ms = self.now_ms();
        self.record_update_at(worker, category, duration, now_ms);
    }

    /// Record one update at a caller-provided time (ms on the aggregator's
    /// clock).
    ///
    /// Callers must supply non-decreasing times per key; [`record_update`]
    /// does so by reading the monotonic clock.
    ///
    /// [`record_update`]: Self::record_update
    pub fn record_update_at(
        &self,
        worker: &WorkerId,
        category: Category,
        duration: Duration,
        now_ms: u64,
    ) {
        let mut inner = self.inner.lock();

        inner
            .keys
            .entry((worker.clone(), category))
            .or_default()
            .record(duration, now_ms);

        // A worker's observable state is the category it is executing.
        match inner.workers.get_mut(worker) {
            Some(stats) => {
                if stats.last_state != category {
                    stats.last_state = category;
                    stats.transitions += 1;
                }
            }
            None => {
                inner.workers.insert(
                    worker.clone(),
                    WorkerStats {
                        last_state: category,
                        transitions: 0,
                    },
                );
            }
        }

        let snapshot = self.compute(&mut inner);
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }

    /// Note one item entering the aggregation channel.
    pub fn increment_queue_depth(&self) {
        self.queue_depth.fetch_add(1, Ordering::AcqRel);
    }

    /// Note one item leaving the aggregation channel. Never goes below zero.
    pub fn decrement_queue_depth(&self) {
        let _ = self
            .queue_depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| d.checked_sub(1));
    }

    /// Current queue depth.
    pub fn queue_depth(&self) -> u64 {
        self.queue_depth.load(Ordering::Acquire)
    }

    /// Immutable copy of the current records.
    pub fn snapshot(&self) -> StatSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot publications.
    pub fn subscribe(&self) -> watch::Receiver<StatSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Wipe all accumulated state and reset the queue depth to zero.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.keys.clear();
        inner.workers.clear();
        inner.memory.reset();
        self.queue_depth.store(0, Ordering::Release);
        self.snapshot_tx.send_replace(Arc::new(Vec::new()));
        debug!("Cleared execution statistics");
    }

    fn compute(&self, inner: &mut Inner) -> Vec<StatRecord> {
        let queue_depth = self.queue_depth();
        let memory_bytes = inner.memory.sample();
        let Inner { keys, workers, .. } = inner;

        keys.iter_mut()
            .map(|((worker, category), stats)| {
                let timestamps = stats.timestamps.make_contiguous();
                let avg_duration_ms = if stats.count > 0 {
                    stats.total_duration.as_secs_f64() * 1_000.0 / stats.count as f64
                } else {
                    0.0
                };

                StatRecord {
                    worker: worker.clone(),
                    category: *category,
                    update_count: stats.count,
                    total_duration: stats.total_duration,
                    avg_duration_ms,
                    peak_updates_per_sec: peak_updates_per_second(timestamps),
                    jitter_ms: jitter(timestamps),
                    state_transitions: workers.get(worker).map_or(0, |w| w.transitions),
                    queue_depth,
                    memory_bytes,
                }
            })
            .collect()
    }

    #[cfg(test)]
    fn retained(&self, worker: &WorkerId, category: Category) -> Vec<u64> {
        self.inner
            .lock()
            .keys
            .get(&(worker.clone(), category))
            .map(|s| s.timestamps.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Default for StatAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tracing_test::traced_test;

    fn worker(n: u64) -> WorkerId {
        WorkerId::new(n, format!("worker-{n}"))
    }

    fn find(snapshot: &[StatRecord], worker: &WorkerId, category: Category) -> StatRecord {
        snapshot
            .iter()
            .find(|r| &r.worker == worker && r.category == category)
            .cloned()
            .expect("record present")
    }

    #[test]
    fn test_count_and_average() {
        let stats = StatAggregator::new();
        let w = worker(1);
        let durations = [100u64, 200, 30, 70];

        for d in durations {
            stats.record_update(&w, Category::Ratio, Duration::from_millis(d));
        }

        let record = find(&stats.snapshot(), &w, Category::Ratio);
        assert_eq!(record.update_count, 4);
        assert_eq!(record.total_duration, Duration::from_millis(400));
        assert!((record.avg_duration_ms - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_updates_average() {
        let stats = StatAggregator::new();
        let w = worker(1);
        stats.record_update(&w, Category::Ratio, Duration::from_millis(100));
        stats.record_update(&w, Category::Ratio, Duration::from_millis(200));

        let record = find(&stats.snapshot(), &w, Category::Ratio);
        assert_eq!(record.update_count, 2);
        assert!((record.avg_duration_ms - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_keys_tracked_independently() {
        let stats = StatAggregator::new();
        let a = worker(1);
        let b = worker(2);
        stats.record_update(&a, Category::Ratio, Duration::from_millis(10));
        stats.record_update(&a, Category::Price, Duration::from_millis(5));
        stats.record_update(&b, Category::Price, Duration::from_millis(5));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(find(&snapshot, &a, Category::Price).update_count, 1);
        assert_eq!(find(&snapshot, &b, Category::Price).update_count, 1);
    }

    #[test]
    fn test_rapid_updates_peak_rate() {
        let stats = StatAggregator::new();
        let w = worker(1);
        for _ in 0..10 {
            stats.record_update(&w, Category::Ratio, Duration::from_millis(5));
        }

        let record = find(&stats.snapshot(), &w, Category::Ratio);
        assert!(record.peak_updates_per_sec >= 10.0);
    }

    #[test]
    fn test_burst_at_epoch_counts_every_update() {
        let stats = StatAggregator::new();
        let w = worker(1);
        for _ in 0..10 {
            stats.record_update_at(&w, Category::Price, Duration::ZERO, 0);
        }

        let record = find(&stats.snapshot(), &w, Category::Price);
        assert_eq!(record.peak_updates_per_sec, 10.0);
    }

    #[test]
    fn test_retention_prunes_old_timestamps() {
        let stats = StatAggregator::new();
        let w = worker(1);
        for t in [0, 1_000, 5_000, 11_000, 12_000] {
            stats.record_update_at(&w, Category::Price, Duration::ZERO, t);
        }

        // Cutoff at 12_000 - 10_000 = 2_000.
        assert_eq!(stats.retained(&w, Category::Price), vec![5_000, 11_000, 12_000]);
        // Count is not affected by pruning.
        assert_eq!(find(&stats.snapshot(), &w, Category::Price).update_count, 5);
    }

    #[test]
    fn test_fixed_clock_has_zero_jitter() {
        let stats = StatAggregator::new();
        let w = worker(1);
        for i in 0..40u64 {
            stats.record_update_at(&w, Category::HighLow, Duration::from_millis(1), i * 50);
        }

        let record = find(&stats.snapshot(), &w, Category::HighLow);
        assert!(record.jitter_ms.abs() < 1e-9);
        // 50ms ticks: 20 per second, window end excludes the tick 1000ms back.
        assert_eq!(record.peak_updates_per_sec, 20.0);
    }

    #[test]
    fn test_state_transitions_counted_per_worker() {
        let stats = StatAggregator::new();
        let w = worker(1);
        stats.record_update(&w, Category::Ratio, Duration::ZERO);
        stats.record_update(&w, Category::Ratio, Duration::ZERO);
        stats.record_update(&w, Category::Price, Duration::ZERO);
        stats.record_update(&w, Category::Ratio, Duration::ZERO);

        let snapshot = stats.snapshot();
        assert_eq!(find(&snapshot, &w, Category::Ratio).state_transitions, 2);
        assert_eq!(find(&snapshot, &w, Category::Price).state_transitions, 2);
    }

    #[test]
    fn test_queue_depth_is_embedded() {
        let stats = StatAggregator::new();
        let w = worker(1);
        stats.increment_queue_depth();
        stats.increment_queue_depth();
        stats.increment_queue_depth();
        stats.record_update(&w, Category::Ratio, Duration::ZERO);
        assert_eq!(find(&stats.snapshot(), &w, Category::Ratio).queue_depth, 3);

        stats.decrement_queue_depth();
        stats.record_update(&w, Category::Ratio, Duration::ZERO);
        assert_eq!(find(&stats.snapshot(), &w, Category::Ratio).queue_depth, 2);
    }

    #[test]
    fn test_queue_depth_concurrent_interleaving() {
        let stats = Arc::new(StatAggregator::new());
        let k = 4_000;
        let m = 2_500;

        for _ in 0..k {
            stats.increment_queue_depth();
        }
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..m / 5 {
                        stats.decrement_queue_depth();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.queue_depth(), (k - m) as u64);
    }

    #[test]
    fn test_queue_depth_never_negative() {
        let stats = StatAggregator::new();
        stats.decrement_queue_depth();
        assert_eq!(stats.queue_depth(), 0);
        stats.increment_queue_depth();
        assert_eq!(stats.queue_depth(), 1);
    }

    #[test]
    #[traced_test]
    fn test_clear_resets_everything() {
        let stats = StatAggregator::new();
        let w = worker(1);
        stats.increment_queue_depth();
        stats.record_update(&w, Category::Ratio, Duration::from_millis(10));
        stats.record_update(&w, Category::Price, Duration::from_millis(10));

        stats.clear();
        assert!(stats.snapshot().is_empty());
        assert_eq!(stats.queue_depth(), 0);
        assert!(logs_contain("Cleared execution statistics"));

        stats.record_update(&w, Category::Ratio, Duration::from_millis(10));
        let record = find(&stats.snapshot(), &w, Category::Ratio);
        assert_eq!(record.update_count, 1);
        assert_eq!(record.state_transitions, 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let stats = Arc::new(StatAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    let w = worker(n);
                    for _ in 0..250 {
                        stats.record_update(&w, Category::Price, Duration::from_millis(2));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 8);
        assert!(snapshot.iter().all(|r| r.update_count == 250));
    }

    #[tokio::test]
    async fn test_subscribers_see_publications() {
        let stats = StatAggregator::new();
        let mut rx = stats.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        stats.record_update(&worker(1), Category::Ratio, Duration::from_millis(100));
        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].update_count, 1);
    }
}
