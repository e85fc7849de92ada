//! Execution statistics for the ticker simulator.
//!
//! [`StatAggregator`] is the single place producers report timing to. It
//! keeps, per (worker, category) key:
//!
//! - update count and cumulative duration
//! - a 10-second sliding history of emission timestamps
//! - derived peak rate ([`peak_updates_per_second`]) and [`jitter`]
//!
//! plus a per-worker state-transition counter, the shared aggregation-channel
//! depth, and a best-effort process memory sample. Readers get immutable
//! snapshots, either by polling [`StatAggregator::snapshot`] or by watching
//! [`StatAggregator::subscribe`].

mod aggregator;
mod memory;
mod window;

pub use aggregator::{StatAggregator, StatSnapshot, RETENTION_WINDOW_MS};
pub use memory::{resident_bytes, MEMORY_UNAVAILABLE};
pub use window::{jitter, peak_updates_per_second, PEAK_WINDOW_MS};
