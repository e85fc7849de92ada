//! End-of-run summary.

use std::collections::BTreeMap;
use tickersim_types::{Category, StatRecord};

/// Per-category totals for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySummary {
    pub updates: u64,
    pub workers: usize,
    pub avg_duration_ms: f64,
    pub peak_updates_per_sec: f64,
    pub max_jitter_ms: f64,
}

/// Summary of a statistics snapshot, for printing at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub categories: BTreeMap<Category, CategorySummary>,
    pub total_updates: u64,
    pub workers: usize,
    pub queue_depth: u64,
    pub memory_bytes: i64,
}

impl RunReport {
    pub fn from_records(records: &[StatRecord]) -> Self {
        let mut report = RunReport {
            memory_bytes: -1,
            ..Default::default()
        };
        let mut workers = std::collections::HashSet::new();
        let mut weighted_ms: BTreeMap<Category, f64> = BTreeMap::new();

        for record in records {
            let summary = report.categories.entry(record.category).or_default();
            summary.updates += record.update_count;
            summary.workers += 1;
            summary.peak_updates_per_sec = summary.peak_updates_per_sec.max(record.peak_updates_per_sec);
            summary.max_jitter_ms = summary.max_jitter_ms.max(record.jitter_ms);
            *weighted_ms.entry(record.category).or_default() +=
                record.avg_duration_ms * record.update_count as f64;

            report.total_updates += record.update_count;
            workers.insert(record.worker.clone());
            report.queue_depth = record.queue_depth;
            report.memory_bytes = record.memory_bytes;
        }

        for (category, summary) in report.categories.iter_mut() {
            if summary.updates > 0 {
                summary.avg_duration_ms = weighted_ms[category] / summary.updates as f64;
            }
        }
        report.workers = workers.len();
        report
    }

    /// Print to stdout.
    pub fn print(&self) {
        println!("=== Run report ===");
        println!("Total updates: {}", self.total_updates);
        println!("Workers:       {}", self.workers);
        println!("Queue depth:   {}", self.queue_depth);
        if self.memory_bytes >= 0 {
            println!("Memory:        {:.1} MiB", self.memory_bytes as f64 / (1024.0 * 1024.0));
        } else {
            println!("Memory:        unavailable");
        }
        for (category, s) in &self.categories {
            println!(
                "  {:<9} updates={:<7} workers={:<3} avg={:.2}ms peak={:.0}/s jitter<={:.2}ms",
                category.as_str(),
                s.updates,
                s.workers,
                s.avg_duration_ms,
                s.peak_updates_per_sec,
                s.max_jitter_ms
            );
        }
    }
}
