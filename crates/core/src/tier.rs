//! Throttle tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Entity counts above this use [`ThrottleTier::Relaxed`].
pub const RELAXED_ENTITY_THRESHOLD: usize = 100;

/// Entity counts above this (and not above the relaxed threshold) use
/// [`ThrottleTier::Normal`].
pub const NORMAL_ENTITY_THRESHOLD: usize = 50;

/// Minimum spacing between emissions of one producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleTier {
    /// 16 ms, roughly one frame at 60 Hz.
    #[default]
    Rapid,
    /// 32 ms.
    Normal,
    /// 64 ms.
    Relaxed,
}

impl ThrottleTier {
    /// Emission window for this tier.
    pub fn window(self) -> Duration {
        match self {
            ThrottleTier::Rapid => Duration::from_millis(16),
            ThrottleTier::Normal => Duration::from_millis(32),
            ThrottleTier::Relaxed => Duration::from_millis(64),
        }
    }

    /// Tier for an entity set of `count` entities. Larger sets emit more
    /// updates in total, so each producer is throttled harder.
    pub fn for_entity_count(count: usize) -> Self {
        if count > RELAXED_ENTITY_THRESHOLD {
            ThrottleTier::Relaxed
        } else if count > NORMAL_ENTITY_THRESHOLD {
            ThrottleTier::Normal
        } else {
            ThrottleTier::Rapid
        }
    }
}

impl fmt::Display for ThrottleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThrottleTier::Rapid => "rapid",
            ThrottleTier::Normal => "normal",
            ThrottleTier::Relaxed => "relaxed",
        };
        write!(f, "{} ({}ms)", name, self.window().as_millis())
    }
}
