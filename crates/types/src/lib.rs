//! Core types for the ticker simulator.
//!
//! Shared by every crate in the workspace: entity state, the update payloads
//! producers emit, the three-state [`Resource`] producers yield, and the
//! [`StatRecord`]s the statistics aggregator publishes.

mod entity;
mod identifiers;
mod stats;
mod update;

pub use entity::{round_price, Entity, Quote, PRICE_SCALE};
pub use identifiers::{EntityId, WorkerId};
pub use stats::StatRecord;
pub use update::{Category, FieldUpdate, Resource, UpdatePayload};
