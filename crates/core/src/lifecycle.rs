//! Simulation lifecycle transition table.
//!
//! Restarting on reconfigure is a sequence of explicit actions rather than a
//! side effect of populate: producers are always cancelled before the
//! applier, the channel is drained before statistics are cleared, and
//! entities are regenerated before anything is respawned.

use crate::tier::ThrottleTier;
use crate::traits::StateMachine;
use std::fmt;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Stopped,
    Running,
}

impl LifecycleState {
    pub fn is_running(self) -> bool {
        self == LifecycleState::Running
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Stopped => write!(f, "stopped"),
            LifecycleState::Running => write!(f, "running"),
        }
    }
}

/// Commands accepted by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Replace the entity set with `count` fresh entities.
    Populate { count: usize },
}

/// Side effects requested by the lifecycle, executed in order by the
/// controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Task management
    // ═══════════════════════════════════════════════════════════════════════
    /// Start the single consumer.
    SpawnApplier,

    /// Start one producer per (entity, category).
    SpawnProducers,

    /// Cancel every producer and wait for them to exit.
    CancelProducers,

    /// Cancel the consumer and wait for it to finish applying what is queued.
    CancelApplier,

    // ═══════════════════════════════════════════════════════════════════════
    // Reset
    // ═══════════════════════════════════════════════════════════════════════
    /// Discard everything still queued in the aggregation channel.
    DrainChannel,

    /// Reset the statistics aggregator.
    ClearStats,

    /// Use this tier for producers spawned from now on.
    SelectThrottle(ThrottleTier),

    /// Regenerate the entity set with `count` entities.
    RegenerateEntities { count: usize },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SpawnApplier => "SpawnApplier",
            Action::SpawnProducers => "SpawnProducers",
            Action::CancelProducers => "CancelProducers",
            Action::CancelApplier => "CancelApplier",
            Action::DrainChannel => "DrainChannel",
            Action::ClearStats => "ClearStats",
            Action::SelectThrottle(_) => "SelectThrottle",
            Action::RegenerateEntities { .. } => "RegenerateEntities",
        }
    }
}

/// Stopped ⇄ Running.
#[derive(Debug, Default)]
pub struct LifecycleMachine {
    state: LifecycleState,
}

impl LifecycleMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }
}

impl StateMachine for LifecycleMachine {
    type Command = Command;
    type Action = Action;

    fn handle(&mut self, command: Command) -> Vec<Action> {
        match (command, self.state) {
            (Command::Start, LifecycleState::Stopped) => {
                self.state = LifecycleState::Running;
                vec![Action::SpawnApplier, Action::SpawnProducers]
            }
            (Command::Start, LifecycleState::Running) => vec![],

            (Command::Stop, LifecycleState::Running) => {
                self.state = LifecycleState::Stopped;
                vec![Action::CancelProducers, Action::CancelApplier]
            }
            (Command::Stop, LifecycleState::Stopped) => vec![],

            (Command::Populate { count }, state) => {
                let was_running = state.is_running();
                let mut actions = Vec::with_capacity(8);

                if was_running {
                    actions.push(Action::CancelProducers);
                    actions.push(Action::CancelApplier);
                }
                actions.push(Action::DrainChannel);
                actions.push(Action::ClearStats);
                actions.push(Action::SelectThrottle(ThrottleTier::for_entity_count(count)));
                actions.push(Action::RegenerateEntities { count });
                if was_running {
                    actions.push(Action::SpawnApplier);
                    actions.push(Action::SpawnProducers);
                }

                actions
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut machine = LifecycleMachine::new();
        assert_eq!(machine.state(), LifecycleState::Stopped);

        assert_eq!(
            machine.handle(Command::Start),
            vec![Action::SpawnApplier, Action::SpawnProducers]
        );
        assert!(machine.state().is_running());

        assert_eq!(
            machine.handle(Command::Stop),
            vec![Action::CancelProducers, Action::CancelApplier]
        );
        assert_eq!(machine.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_redundant_commands_are_noops() {
        let mut machine = LifecycleMachine::new();
        assert!(machine.handle(Command::Stop).is_empty());

        machine.handle(Command::Start);
        assert!(machine.handle(Command::Start).is_empty());
        assert!(machine.state().is_running());
    }

    #[test]
    fn test_populate_while_stopped() {
        let mut machine = LifecycleMachine::new();
        assert_eq!(
            machine.handle(Command::Populate { count: 5 }),
            vec![
                Action::DrainChannel,
                Action::ClearStats,
                Action::SelectThrottle(ThrottleTier::Rapid),
                Action::RegenerateEntities { count: 5 },
            ]
        );
        assert_eq!(machine.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_populate_while_running_restarts() {
        let mut machine = LifecycleMachine::new();
        machine.handle(Command::Start);

        let actions = machine.handle(Command::Populate { count: 120 });
        let names: Vec<_> = actions.iter().map(Action::type_name).collect();
        assert_eq!(
            names,
            vec![
                "CancelProducers",
                "CancelApplier",
                "DrainChannel",
                "ClearStats",
                "SelectThrottle",
                "RegenerateEntities",
                "SpawnApplier",
                "SpawnProducers",
            ]
        );
        assert!(actions.contains(&Action::SelectThrottle(ThrottleTier::Relaxed)));
        assert!(machine.state().is_running());
    }

    #[test]
    fn test_cancel_precedes_clear_precedes_regenerate() {
        let mut machine = LifecycleMachine::new();
        machine.handle(Command::Start);
        let actions = machine.handle(Command::Populate { count: 60 });

        let position = |a: Action| actions.iter().position(|x| *x == a).unwrap();
        assert!(position(Action::CancelApplier) < position(Action::ClearStats));
        assert!(position(Action::DrainChannel) < position(Action::ClearStats));
        assert!(
            position(Action::ClearStats) < position(Action::RegenerateEntities { count: 60 })
        );
        assert!(
            position(Action::RegenerateEntities { count: 60 }) < position(Action::SpawnProducers)
        );
    }
}
