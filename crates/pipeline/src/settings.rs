//! Simulation settings read live by running producers.

use crate::error::{ParseSettingError, SettingError};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tickersim_types::Category;

/// A setting that can be changed while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Ratio update interval (ms).
    Ratio,
    /// Price update interval (ms).
    Price,
    /// High/low update interval (ms).
    HighLow,
    /// Number of entities to generate on the next populate. Not a time.
    EntityCount,
}

impl FromStr for Setting {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ratio" | "PE" => Ok(Setting::Ratio),
            "price" | "current_price" => Ok(Setting::Price),
            "highLow" | "high_low" => Ok(Setting::HighLow),
            "entityCount" | "list_size" => Ok(Setting::EntityCount),
            other => Err(ParseSettingError(other.to_string())),
        }
    }
}

impl From<Category> for Setting {
    fn from(category: Category) -> Self {
        match category {
            Category::Ratio => Setting::Ratio,
            Category::Price => Setting::Price,
            Category::HighLow => Setting::HighLow,
        }
    }
}

/// Shared settings. Producers read the interval for their category at the
/// start of every wait, so changes apply on the next iteration without a
/// restart.
#[derive(Debug)]
pub struct LiveSettings {
    ratio_ms: AtomicU64,
    price_ms: AtomicU64,
    high_low_ms: AtomicU64,
    entity_count: AtomicUsize,
}

impl LiveSettings {
    pub fn new(ratio: Duration, price: Duration, high_low: Duration, entity_count: usize) -> Self {
        Self {
            ratio_ms: AtomicU64::new(ratio.as_millis() as u64),
            price_ms: AtomicU64::new(price.as_millis() as u64),
            high_low_ms: AtomicU64::new(high_low.as_millis() as u64),
            entity_count: AtomicUsize::new(entity_count),
        }
    }

    /// Current wait interval for a category.
    pub fn interval(&self, category: Category) -> Duration {
        let ms = match category {
            Category::Ratio => &self.ratio_ms,
            Category::Price => &self.price_ms,
            Category::HighLow => &self.high_low_ms,
        };
        Duration::from_millis(ms.load(Ordering::Relaxed))
    }

    /// Configured entity count.
    pub fn entity_count(&self) -> usize {
        self.entity_count.load(Ordering::Relaxed)
    }

    pub fn set_entity_count(&self, count: usize) {
        self.entity_count.store(count, Ordering::Relaxed);
    }

    /// Update one setting. Intervals are in milliseconds and must be
    /// non-zero; a rejected value leaves the setting unchanged.
    pub fn set(&self, setting: Setting, value: u64) -> Result<(), SettingError> {
        let interval = match setting {
            Setting::Ratio => &self.ratio_ms,
            Setting::Price => &self.price_ms,
            Setting::HighLow => &self.high_low_ms,
            Setting::EntityCount => {
                self.set_entity_count(usize::try_from(value).unwrap_or(usize::MAX));
                return Ok(());
            }
        };
        if value == 0 {
            return Err(SettingError::ZeroInterval(setting));
        }
        interval.store(value, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(1_500),
            Duration::from_millis(1_000),
            Duration::from_millis(1_000),
            5,
        )
    }
}
