//! Derived statistics over a retained timestamp history.
//!
//! Timestamps are milliseconds on a monotonic clock and must be sorted
//! ascending, which holds for histories built by appending `now()`.

/// Width of the peak-rate window.
pub const PEAK_WINDOW_MS: u64 = 1_000;

/// Maximum number of timestamps falling inside any one-second window.
///
/// Two-pointer sweep: each timestamp in turn is the window end, and the
/// window start advances past everything at or before `end - 1000ms`.
/// Written as an addition so ends inside the first second keep every sample.
/// O(n) in the length of the retained history.
pub fn peak_updates_per_second(timestamps: &[u64]) -> f64 {
    match timestamps.len() {
        0 => return 0.0,
        1 => return 1.0,
        _ => {}
    }

    let mut peak = 0usize;
    let mut start = 0usize;

    for (end, &t_end) in timestamps.iter().enumerate() {
        while start < end && timestamps[start] + PEAK_WINDOW_MS <= t_end {
            start += 1;
        }
        peak = peak.max(end - start + 1);
    }

    peak as f64
}

/// Population standard deviation of the gaps between consecutive timestamps.
pub fn jitter(timestamps: &[u64]) -> f64 {
    if timestamps.len() < 2 {
        return 0.0;
    }

    let gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]) as f64)
        .collect();

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps.iter().map(|g| (g - mean) * (g - mean)).sum::<f64>() / gaps.len() as f64;
    variance.sqrt()
}
