//! Statistics export.

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tickersim_types::StatRecord;
use tracing::{info, warn};

/// Export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No metrics to export")]
    NoMetrics,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where an export ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub file_name: String,
    pub path: PathBuf,
    pub format: ExportFormat,
}

/// Accepts a finalized statistics snapshot and persists it somewhere.
pub trait StatsExporter: Send + Sync {
    fn export(
        &self,
        records: &[StatRecord],
        format: ExportFormat,
    ) -> Result<ExportReceipt, ExportError>;
}

/// Writes `metrics_<timestamp>.<ext>` files into a directory.
#[derive(Debug, Clone)]
pub struct FileExporter {
    dir: PathBuf,
}

const CSV_HEADER: [&str; 10] = [
    "Worker ID",
    "Worker Name",
    "Category",
    "Update Count",
    "Avg Duration (ms)",
    "Peak Updates/s",
    "Jitter (ms)",
    "State Transitions",
    "Queue Depth",
    "Memory (bytes)",
];

#[derive(Serialize)]
struct ExportedRecord<'a> {
    worker_id: u64,
    worker_name: &'a str,
    category: &'static str,
    update_count: u64,
    avg_duration_ms: f64,
    peak_updates_per_sec: f64,
    jitter_ms: f64,
    state_transitions: u64,
    queue_depth: u64,
    memory_bytes: i64,
}

impl<'a> From<&'a StatRecord> for ExportedRecord<'a> {
    fn from(record: &'a StatRecord) -> Self {
        Self {
            worker_id: record.worker.number(),
            worker_name: record.worker.name(),
            category: record.category.as_str(),
            update_count: record.update_count,
            avg_duration_ms: record.avg_duration_ms,
            peak_updates_per_sec: record.peak_updates_per_sec,
            jitter_ms: record.jitter_ms,
            state_transitions: record.state_transitions,
            queue_depth: record.queue_depth,
            memory_bytes: record.memory_bytes,
        }
    }
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    export_time: String,
    metrics_count: usize,
    metrics: Vec<ExportedRecord<'a>>,
}

impl FileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Render records as CSV. Every field is quoted, embedded quotes doubled.
    pub fn render_csv(records: &[StatRecord]) -> String {
        let mut out = csv_row(CSV_HEADER.iter().copied());
        for record in records {
            out.push('\n');
            out.push_str(&csv_row(
                [
                    record.worker.number().to_string(),
                    record.worker.name().to_string(),
                    record.category.as_str().to_string(),
                    record.update_count.to_string(),
                    format!("{:.3}", record.avg_duration_ms),
                    format!("{:.1}", record.peak_updates_per_sec),
                    format!("{:.3}", record.jitter_ms),
                    record.state_transitions.to_string(),
                    record.queue_depth.to_string(),
                    record.memory_bytes.to_string(),
                ]
                .iter()
                .map(String::as_str),
            ));
        }
        out
    }

    /// Render records as a pretty-printed JSON document.
    pub fn render_json(records: &[StatRecord], export_time: String) -> Result<String, ExportError> {
        let document = ExportDocument {
            export_time,
            metrics_count: records.len(),
            metrics: records.iter().map(ExportedRecord::from).collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

fn csv_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

impl StatsExporter for FileExporter {
    fn export(
        &self,
        records: &[StatRecord],
        format: ExportFormat,
    ) -> Result<ExportReceipt, ExportError> {
        if records.is_empty() {
            return Err(ExportError::NoMetrics);
        }

        let now = Local::now();
        let file_name = format!(
            "metrics_{}.{}",
            now.format("%Y-%m-%d_%H%M%S"),
            format.extension()
        );
        let path = self.dir.join(&file_name);

        let contents = match format {
            ExportFormat::Csv => Self::render_csv(records),
            ExportFormat::Json => {
                Self::render_json(records, now.format("%Y-%m-%dT%H:%M:%S").to_string())?
            }
        };

        if let Err(source) = std::fs::write(&path, contents) {
            warn!(path = %path.display(), error = %source, "Export failed");
            return Err(ExportError::Io { path, source });
        }

        info!(path = %path.display(), records = records.len(), %format, "Exported metrics");
        Ok(ExportReceipt {
            file_name,
            path,
            format,
        })
    }
}
