//! Error types for the update pipeline.

use crate::settings::Setting;
use thiserror::Error;
use tickersim_types::EntityId;

/// Reasons a producer loop stops.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// The tracked entity no longer exists in the entity source.
    #[error("Entity with key {key} not found")]
    NotFound { key: String },

    /// The ratio field could not be read as a decimal.
    #[error("Invalid ratio value {value:?} for {key}")]
    InvalidRatio { key: String, value: String },
}

/// Reasons a single payload could not be applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The entity at the payload's index now has a different key, typically
    /// because the entity set was regenerated mid-run.
    #[error("Payload for {expected} addressed {id}, which now holds {found}")]
    KeyMismatch {
        id: EntityId,
        expected: String,
        found: String,
    },
}

/// Sending into a closed aggregation channel.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Aggregation channel is closed")]
pub struct ChannelClosed<T>(pub T);

/// An unrecognised live-setting name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown setting: {0}")]
pub struct ParseSettingError(pub String);

/// A live-setting value that would stall or spin producers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingError {
    #[error("Interval for {0:?} must be non-zero")]
    ZeroInterval(Setting),
}
