//! Ticker Simulator
//!
//! Many stock-like entities refreshed concurrently by producer tasks, funnelled
//! through a bounded drop-oldest channel into a single applier, with
//! per-worker execution statistics recorded along the way.
//!
//! # Architecture
//!
//! The simulator wires the pipeline crates together:
//!
//! - **Entity sources**: where entities come from ([`CatalogSource`])
//! - **Lifecycle**: start/stop/populate through the core transition table
//! - **Statistics**: live snapshots plus CSV/JSON export
//! - **Configuration**: TOML with per-category intervals
//!
//! # Example
//!
//! ```ignore
//! use tickersim_simulator::{CatalogSource, Simulation, SimulatorConfig};
//! use std::time::Duration;
//!
//! let config = SimulatorConfig::default().with_entity_count(10);
//! let sim = Simulation::new(&config, CatalogSource::new());
//!
//! sim.populate_entities(config.entity_count).await;
//! sim.start().await;
//! tokio::time::sleep(Duration::from_secs(5)).await;
//! sim.stop().await;
//!
//! RunReport::from_records(&sim.stats()).print();
//! ```

pub mod config;
pub mod controller;
pub mod export;
pub mod report;
pub mod source;

pub use config::{ConfigError, IntervalConfig, SimulatorConfig};
pub use controller::Simulation;
pub use export::{ExportError, ExportFormat, ExportReceipt, FileExporter, StatsExporter};
pub use report::RunReport;
pub use source::{CatalogSource, EntitySource, CATALOG_LEN};
