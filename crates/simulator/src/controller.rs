//! Simulation controller.
//!
//! [`Simulation`] owns every long-lived piece of the pipeline: the entity
//! board, the statistics aggregator, the live settings, the aggregation
//! channel and the tasks that use them. Lifecycle commands go through a
//! [`LifecycleMachine`]; the controller only executes the actions it
//! returns.

use crate::export::{ExportError, ExportReceipt, StatsExporter};
use crate::source::EntitySource;
use crate::{ConfigError, SimulatorConfig};
use futures::StreamExt;
use std::sync::Arc;
use tickersim_core::{Action, Command, LifecycleMachine, LifecycleState, StateMachine, ThrottleTier};
use tickersim_pipeline::{
    aggregation_channel, drive, throttle_updates, EntityBoard, EntityLookup, ErrorSignal,
    LiveSettings, Receiver, Sender, Setting, SettingError, UpdateApplier, UpdateProducer,
    INTERNAL_ERROR_MESSAGE,
};
use tickersim_stats::{StatAggregator, StatSnapshot};
use tickersim_types::{Category, Entity, UpdatePayload};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

struct RunningApplier {
    cancel: CancellationToken,
    handle: JoinHandle<Receiver<UpdatePayload>>,
}

struct RunningProducers {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

/// Mutable lifecycle state. Only touched with the lifecycle lock held, so
/// commands execute one at a time and in full.
struct Lifecycle {
    machine: LifecycleMachine,
    tier: ThrottleTier,
    sender: Sender<UpdatePayload>,
    /// Parked here while no applier is running.
    receiver: Option<Receiver<UpdatePayload>>,
    applier: Option<RunningApplier>,
    producers: Option<RunningProducers>,
    shut_down: bool,
}

/// A running (or runnable) ticker simulation.
pub struct Simulation<S: EntitySource> {
    source: Arc<S>,
    board: EntityBoard,
    stats: Arc<StatAggregator>,
    settings: Arc<LiveSettings>,
    errors: ErrorSignal,
    channel_capacity: usize,
    throttle_override: Option<ThrottleTier>,
    lifecycle: Mutex<Lifecycle>,
}

impl<S: EntitySource> Simulation<S> {
    /// Build a stopped simulation over `source`'s current entities.
    pub fn new(config: &SimulatorConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let board = EntityBoard::new(source.entities());
        let stats = Arc::new(StatAggregator::new());
        let (sender, receiver) = aggregation_channel(config.channel_capacity, stats.clone());
        let tier = config
            .throttle
            .unwrap_or_else(|| ThrottleTier::for_entity_count(board.len()));

        Ok(Self {
            source: Arc::new(source),
            board,
            stats,
            settings: Arc::new(config.live_settings()),
            errors: ErrorSignal::new(),
            channel_capacity: config.channel_capacity,
            throttle_override: config.throttle,
            lifecycle: Mutex::new(Lifecycle {
                machine: LifecycleMachine::new(),
                tier,
                sender,
                receiver: Some(receiver),
                applier: None,
                producers: None,
                shut_down: false,
            }),
        })
    }

    /// Start the applier and one producer per (entity, category).
    pub async fn start(&self) {
        self.execute(Command::Start).await;
    }

    /// Stop every producer, then the applier. Updates already queued are
    /// applied before this returns.
    pub async fn stop(&self) {
        self.execute(Command::Stop).await;
    }

    /// Replace the entity set with `count` fresh entities, resetting
    /// statistics and picking a throttle tier for the new size. Restarts
    /// the simulation if it was running.
    pub async fn populate_entities(&self, count: usize) {
        self.execute(Command::Populate { count }).await;
    }

    /// Populate with the entity count currently held in the live settings.
    pub async fn repopulate(&self) {
        self.populate_entities(self.settings.entity_count()).await;
    }

    /// Change a live setting. Running producers pick new intervals up on
    /// their next iteration. Zero intervals are rejected.
    pub fn set_interval(&self, setting: Setting, value: u64) -> Result<(), SettingError> {
        self.settings.set(setting, value)?;
        info!(?setting, value, "Updated setting");
        Ok(())
    }

    /// Stop and close the aggregation channel. Further commands are ignored.
    pub async fn shutdown(&self) {
        self.execute(Command::Stop).await;
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.sender.close();
        lifecycle.shut_down = true;
        info!("Simulation shut down");
    }

    /// Export the current statistics snapshot.
    pub fn export_stats(
        &self,
        exporter: &dyn StatsExporter,
        format: &str,
    ) -> Result<ExportReceipt, ExportError> {
        let format = format.parse()?;
        let snapshot = self.stats.snapshot();
        if snapshot.is_empty() {
            return Err(ExportError::NoMetrics);
        }
        exporter.export(&snapshot, format)
    }

    /// Most recent error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.errors.current()
    }

    pub fn clear_error(&self) {
        self.errors.clear();
    }

    /// Watch the last-error signal.
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.errors.subscribe()
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> StatSnapshot {
        self.stats.snapshot()
    }

    /// Watch statistics snapshots as they are published.
    pub fn subscribe_stats(&self) -> watch::Receiver<StatSnapshot> {
        self.stats.subscribe()
    }

    /// Copy of the live entity state.
    pub fn entities(&self) -> Vec<Entity> {
        self.board.snapshot()
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.lock().await.machine.state()
    }

    /// Throttle tier applied to producers spawned next.
    pub async fn throttle_tier(&self) -> ThrottleTier {
        self.lifecycle.lock().await.tier
    }

    async fn execute(&self, command: Command) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.shut_down {
            warn!(?command, "Ignoring command after shutdown");
            return;
        }

        let actions = lifecycle.machine.handle(command);
        for action in actions {
            trace!(action = action.type_name(), "Executing lifecycle action");
            self.perform(&mut lifecycle, action).await;
        }
        debug!(?command, state = %lifecycle.machine.state(), "Handled lifecycle command");
    }

    async fn perform(&self, lifecycle: &mut Lifecycle, action: Action) {
        match action {
            Action::SpawnApplier => {
                let Some(receiver) = lifecycle.receiver.take() else {
                    warn!("Applier already running");
                    return;
                };
                let cancel = CancellationToken::new();
                let applier = UpdateApplier::new(
                    receiver,
                    self.board.clone(),
                    self.stats.clone(),
                    self.errors.clone(),
                    cancel.clone(),
                );
                lifecycle.applier = Some(RunningApplier {
                    cancel,
                    handle: tokio::spawn(applier.run()),
                });
            }

            Action::SpawnProducers => {
                let entities = self.board.snapshot();
                let lookup: Arc<dyn EntityLookup> = self.source.clone();
                let cancel = CancellationToken::new();
                let tracker = TaskTracker::new();

                for entity in &entities {
                    for category in Category::ALL {
                        let stream = UpdateProducer::new(
                            entity.key.clone(),
                            category,
                            lookup.clone(),
                            self.settings.clone(),
                            self.stats.clone(),
                        )
                        .into_stream();

                        // Price is the highest-frequency category; only it is throttled.
                        let stream = if category == Category::Price {
                            throttle_updates(stream, lifecycle.tier.window()).boxed()
                        } else {
                            stream.boxed()
                        };

                        tracker.spawn(drive(
                            stream,
                            lifecycle.sender.clone(),
                            self.errors.clone(),
                            cancel.clone(),
                        ));
                    }
                }
                tracker.close();

                info!(
                    entities = entities.len(),
                    producers = tracker.len(),
                    tier = %lifecycle.tier,
                    "Spawned producers"
                );
                lifecycle.producers = Some(RunningProducers { cancel, tracker });
            }

            Action::CancelProducers => {
                if let Some(producers) = lifecycle.producers.take() {
                    producers.cancel.cancel();
                    producers.tracker.wait().await;
                    debug!("Producers stopped");
                }
            }

            Action::CancelApplier => {
                if let Some(applier) = lifecycle.applier.take() {
                    applier.cancel.cancel();
                    match applier.handle.await {
                        Ok(receiver) => lifecycle.receiver = Some(receiver),
                        Err(e) => {
                            error!(error = %e, "Applier task failed");
                            self.errors.raise(INTERNAL_ERROR_MESSAGE);
                            let (sender, receiver) =
                                aggregation_channel(self.channel_capacity, self.stats.clone());
                            lifecycle.sender = sender;
                            lifecycle.receiver = Some(receiver);
                        }
                    }
                }
            }

            Action::DrainChannel => {
                if let Some(receiver) = lifecycle.receiver.as_mut() {
                    let dropped = receiver.drain();
                    if dropped > 0 {
                        debug!(dropped, "Drained aggregation channel");
                    }
                }
            }

            Action::ClearStats => self.stats.clear(),

            Action::SelectThrottle(tier) => {
                lifecycle.tier = self.throttle_override.unwrap_or(tier);
            }

            Action::RegenerateEntities { count } => {
                let entities = self.source.regenerate(count).await;
                self.board.replace(entities);
                self.settings.set_entity_count(count);
                info!(count, "Populated entities");
            }
        }
    }
}

impl<S: EntitySource> Drop for Simulation<S> {
    fn drop(&mut self) {
        let lifecycle = self.lifecycle.get_mut();
        if let Some(producers) = lifecycle.producers.take() {
            producers.cancel.cancel();
        }
        if let Some(applier) = lifecycle.applier.take() {
            applier.cancel.cancel();
        }
    }
}
