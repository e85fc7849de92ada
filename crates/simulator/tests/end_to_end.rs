//! Full pipeline runs against a real multi-threaded runtime.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::time::Duration;
use tickersim_core::LifecycleState;
use tickersim_pipeline::{EntityLookup, Setting};
use tickersim_simulator::{
    EntitySource, ExportFormat, FileExporter, IntervalConfig, Simulation, SimulatorConfig,
};
use tickersim_test_helpers::fixture_entities;
use tickersim_types::{Category, Entity};

/// Entity source over the shared test fixtures.
#[derive(Default)]
struct FixtureSource {
    entities: RwLock<Vec<Entity>>,
}

impl EntityLookup for FixtureSource {
    fn find(&self, key: &str) -> Option<Entity> {
        self.entities.read().iter().find(|e| e.key == key).cloned()
    }
}

impl EntitySource for FixtureSource {
    fn entities(&self) -> Vec<Entity> {
        self.entities.read().clone()
    }

    async fn regenerate(&self, count: usize) -> Vec<Entity> {
        let entities = fixture_entities(count);
        *self.entities.write() = entities.clone();
        entities
    }
}

fn fast_config() -> SimulatorConfig {
    SimulatorConfig::default()
        .with_intervals(IntervalConfig::uniform(Duration::from_millis(10)))
        .with_channel_capacity(1_000)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_five_entities_all_written() {
    let sim = Simulation::new(&fast_config(), FixtureSource::default()).unwrap();
    sim.populate_entities(5).await;
    sim.start().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    sim.stop().await;

    let entities = sim.entities();
    assert_eq!(entities.len(), 5);
    assert!(entities.iter().all(|e| e.last_worker.is_some()));
    assert_eq!(sim.error_message(), None);
    assert_eq!(sim.state().await, LifecycleState::Stopped);

    // Every category ran and prices only moved up.
    let stats = sim.stats();
    let categories: HashSet<_> = stats.iter().map(|r| r.category).collect();
    assert_eq!(categories.len(), Category::ALL.len());
    for (before, after) in fixture_entities(5).iter().zip(&entities) {
        assert!(after.quote.current >= before.quote.current);
        assert!(after.quote.high > before.quote.high);
        assert!(after.quote.low > before.quote.low);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_populate_after_stop_resets_stats() {
    let sim = Simulation::new(&fast_config(), FixtureSource::default()).unwrap();
    sim.populate_entities(8).await;
    sim.start().await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    sim.stop().await;

    let stats = sim.stats();
    let total: u64 = stats.iter().map(|r| r.update_count).sum();
    assert!(total > 0);

    // Repopulating publishes an empty snapshot.
    let mut rx = sim.subscribe_stats();
    sim.populate_entities(8).await;
    rx.changed().await.unwrap();
    assert!(rx.borrow().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_intervals_set_before_start_apply() {
    let sim = Simulation::new(&fast_config(), FixtureSource::default()).unwrap();
    sim.populate_entities(1).await;
    sim.set_interval(Setting::Price, 10_000).unwrap();
    sim.set_interval(Setting::Ratio, 10_000).unwrap();
    sim.set_interval(Setting::HighLow, 10_000).unwrap();
    sim.start().await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    sim.stop().await;

    // Every producer is still inside its first 10s wait.
    assert!(sim.stats().is_empty());
    assert_eq!(sim.entities()[0].last_worker, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_and_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let sim = Simulation::new(&fast_config(), FixtureSource::default()).unwrap();
    sim.populate_entities(3).await;
    sim.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    sim.shutdown().await;

    let receipt = sim
        .export_stats(&FileExporter::new(dir.path()), "csv")
        .unwrap();
    assert_eq!(receipt.format, ExportFormat::Csv);

    let contents = std::fs::read_to_string(&receipt.path).unwrap();
    assert_eq!(contents.lines().count(), sim.stats().len() + 1);
    assert!(contents.lines().skip(1).all(|l| l.starts_with('"')));
}
