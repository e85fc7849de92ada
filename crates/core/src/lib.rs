//! Core lifecycle types for the ticker simulator.
//!
//! The simulation controller never starts or stops tasks on its own
//! initiative. It feeds [`Command`]s into a [`LifecycleMachine`] and
//! executes the [`Action`]s that come back, in order.

mod lifecycle;
mod tier;
mod traits;

pub use lifecycle::{Action, Command, LifecycleMachine, LifecycleState};
pub use tier::{ThrottleTier, NORMAL_ENTITY_THRESHOLD, RELAXED_ENTITY_THRESHOLD};
pub use traits::StateMachine;
