//! Execution statistics records.

use crate::{Category, WorkerId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregated execution statistics for one (worker, category) pair.
///
/// Produced by the statistics aggregator as part of an immutable snapshot;
/// never mutated after publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub worker: WorkerId,
    pub category: Category,
    /// Total updates recorded for this key since the last reset.
    pub update_count: u64,
    /// Sum of all recorded durations.
    pub total_duration: Duration,
    /// `total_duration / update_count` in milliseconds.
    pub avg_duration_ms: f64,
    /// Highest number of updates seen inside any one-second window of the
    /// retained history.
    pub peak_updates_per_sec: f64,
    /// Standard deviation of the gaps between retained timestamps, in ms.
    pub jitter_ms: f64,
    /// Times the worker switched execution state.
    pub state_transitions: u64,
    /// Aggregation channel depth at the time the snapshot was computed.
    pub queue_depth: u64,
    /// Resident memory of the process in bytes, `-1` when unavailable.
    pub memory_bytes: i64,
}
