//! Configuration types for the simulator.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tickersim_core::ThrottleTier;
use tickersim_pipeline::{LiveSettings, DEFAULT_CHANNEL_CAPACITY};
use tickersim_types::Category;

/// Errors loading or validating a [`SimulatorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Update interval for {0} must be non-zero")]
    ZeroInterval(Category),

    #[error("Channel capacity must be non-zero")]
    ZeroCapacity,
}

/// Configuration for a simulation run.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Capacity of the aggregation channel.
    pub channel_capacity: usize,

    /// Number of entities generated on the first populate.
    pub entity_count: usize,

    /// Fixed throttle tier. When unset the tier follows the entity count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ThrottleTier>,

    /// Directory statistics exports are written to.
    pub export_dir: PathBuf,

    /// Per-category update intervals.
    pub intervals: IntervalConfig,
}

impl SimulatorConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check the invariants deserialization cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            if self.intervals.get(category).is_zero() {
                return Err(ConfigError::ZeroInterval(category));
            }
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Set the interval for one category.
    pub fn with_interval(mut self, category: Category, interval: Duration) -> Self {
        match category {
            Category::Ratio => self.intervals.ratio = interval,
            Category::Price => self.intervals.price = interval,
            Category::HighLow => self.intervals.high_low = interval,
        }
        self
    }

    /// Set every interval at once.
    pub fn with_intervals(mut self, intervals: IntervalConfig) -> Self {
        self.intervals = intervals;
        self
    }

    /// Set the aggregation channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the initial entity count.
    pub fn with_entity_count(mut self, count: usize) -> Self {
        self.entity_count = count;
        self
    }

    /// Pin the throttle tier instead of deriving it from the entity count.
    pub fn with_throttle(mut self, tier: ThrottleTier) -> Self {
        self.throttle = Some(tier);
        self
    }

    /// Set the export directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Live settings seeded from this config.
    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings::new(
            self.intervals.ratio,
            self.intervals.price,
            self.intervals.high_low,
            self.entity_count,
        )
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            entity_count: 5,
            throttle: None,
            export_dir: std::env::temp_dir(),
            intervals: IntervalConfig::default(),
        }
    }
}

/// Update intervals, written in TOML as human-readable durations
/// (`"1500ms"`, `"2s"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntervalConfig {
    #[serde(with = "humantime_duration")]
    pub ratio: Duration,

    #[serde(with = "humantime_duration")]
    pub price: Duration,

    #[serde(with = "humantime_duration")]
    pub high_low: Duration,
}

impl IntervalConfig {
    /// Interval for one category.
    pub fn get(&self, category: Category) -> Duration {
        match category {
            Category::Ratio => self.ratio,
            Category::Price => self.price,
            Category::HighLow => self.high_low,
        }
    }

    /// The same interval for every category.
    pub fn uniform(interval: Duration) -> Self {
        Self {
            ratio: interval,
            price: interval,
            high_low: interval,
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            ratio: Duration::from_millis(1_500),
            price: Duration::from_millis(1_000),
            high_low: Duration::from_millis(1_000),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = SimulatorConfig::from_toml("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.channel_capacity, 15_000);
        assert_eq!(config.intervals.ratio, Duration::from_millis(1_500));
    }

    #[test]
    fn test_parse_full_document() {
        let config = SimulatorConfig::from_toml(
            r#"
            channel_capacity = 64
            entity_count = 120
            throttle = "normal"
            export_dir = "/tmp/exports"

            [intervals]
            ratio = "250ms"
            price = "1s"
            high_low = "2s 500ms"
            "#,
        )
        .unwrap();

        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.entity_count, 120);
        assert_eq!(config.throttle, Some(ThrottleTier::Normal));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(config.intervals.ratio, Duration::from_millis(250));
        assert_eq!(config.intervals.high_low, Duration::from_millis(2_500));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            SimulatorConfig::from_toml("channel_capacity = 0"),
            Err(ConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            SimulatorConfig::from_toml("[intervals]\nprice = \"0s\""),
            Err(ConfigError::ZeroInterval(Category::Price))
        ));
        assert!(matches!(
            SimulatorConfig::from_toml("[intervals]\nprice = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SimulatorConfig::from_toml("shards = 4"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip_through_builder() {
        let config = SimulatorConfig::default()
            .with_interval(Category::Price, Duration::from_millis(20))
            .with_entity_count(7)
            .with_throttle(ThrottleTier::Relaxed);

        let parsed = SimulatorConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulatorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
