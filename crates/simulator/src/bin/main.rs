//! Ticker Simulator CLI
//!
//! Runs a simulation for a fixed duration, prints a summary and optionally
//! exports the final statistics.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tickersim_simulator::{CatalogSource, FileExporter, RunReport, Simulation, SimulatorConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tickersim")]
#[command(about = "Concurrent ticker update simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as TOML
    Config,

    /// Run the simulation
    Run {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of entities (overrides the config)
        #[arg(short, long)]
        entities: Option<usize>,

        /// Duration to run (e.g., "30s", "5m")
        #[arg(short, long, default_value = "30s")]
        duration: humantime::Duration,

        /// Export final statistics in this format (csv, json)
        #[arg(long)]
        export: Option<String>,

        /// Directory for exports (overrides the config)
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Worker threads (defaults to the number of cores)
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            // Output goes to stdout; no tracing.
            print!("{}", SimulatorConfig::default().to_toml()?);
        }

        Commands::Run {
            config,
            entities,
            duration,
            export,
            export_dir,
            workers,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let mut config = match config {
                Some(path) => SimulatorConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => SimulatorConfig::default(),
            };
            if let Some(count) = entities {
                config = config.with_entity_count(count);
            }
            if let Some(dir) = export_dir {
                config = config.with_export_dir(dir);
            }

            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.enable_all().thread_name_fn(|| {
                static NEXT: AtomicUsize = AtomicUsize::new(0);
                format!("tickersim-worker-{}", NEXT.fetch_add(1, Ordering::Relaxed))
            });
            if let Some(workers) = workers {
                builder.worker_threads(workers);
            }
            let runtime = builder.build().context("building runtime")?;

            runtime.block_on(run(config, *duration, export))?;
        }
    }

    Ok(())
}

async fn run(
    config: SimulatorConfig,
    duration: std::time::Duration,
    export: Option<String>,
) -> anyhow::Result<()> {
    let sim = Simulation::new(&config, CatalogSource::new()).context("invalid config")?;
    sim.repopulate().await;

    info!(
        entities = config.entity_count,
        duration = %humantime::format_duration(duration),
        "Starting simulation"
    );
    sim.start().await;

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    sim.shutdown().await;

    if let Some(message) = sim.error_message() {
        warn!(%message, "Simulation reported an error");
    }

    let stats = sim.stats();
    RunReport::from_records(&stats).print();

    if let Some(format) = export {
        let exporter = FileExporter::new(&config.export_dir);
        let receipt = sim
            .export_stats(&exporter, &format)
            .context("exporting statistics")?;
        println!("Exported {}", receipt.path.display());
    }

    Ok(())
}
