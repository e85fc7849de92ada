//! Best-effort process memory sampling.

use std::time::{Duration, Instant};

/// Returned when the platform cannot report memory usage.
pub const MEMORY_UNAVAILABLE: i64 = -1;

/// Minimum time between two reads of the underlying source.
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Caches the resident set size so the hot path does not hit procfs on
/// every recorded update.
#[derive(Debug, Default)]
pub(crate) struct MemorySampler {
    last: Option<(Instant, i64)>,
}

impl MemorySampler {
    pub(crate) fn sample(&mut self) -> i64 {
        let now = Instant::now();
        match self.last {
            Some((at, bytes)) if now.duration_since(at) < SAMPLE_INTERVAL => bytes,
            _ => {
                let bytes = resident_bytes();
                self.last = Some((now, bytes));
                bytes
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.last = None;
    }
}

/// Resident set size of the current process in bytes, or
/// [`MEMORY_UNAVAILABLE`].
#[cfg(target_os = "linux")]
pub fn resident_bytes() -> i64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_vm_rss(&status))
        .unwrap_or(MEMORY_UNAVAILABLE)
}

#[cfg(not(target_os = "linux"))]
pub fn resident_bytes() -> i64 {
    MEMORY_UNAVAILABLE
}

/// Extract `VmRSS` (reported in kB) from a `/proc/<pid>/status` body.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<i64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: i64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kb * 1024)
}
