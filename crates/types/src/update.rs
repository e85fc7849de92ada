//! Update payloads flowing from producers to the applier.

use crate::{EntityId, WorkerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Independently scheduled update kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Price/earnings ratio.
    Ratio,
    /// Current price.
    Price,
    /// Daily high and low.
    HighLow,
}

impl Category {
    /// All categories, in producer spawn order.
    pub const ALL: [Category; 3] = [Category::Ratio, Category::Price, Category::HighLow];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Ratio => "ratio",
            Category::Price => "price",
            Category::HighLow => "high_low",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New field values for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldUpdate {
    Ratio(String),
    Price(Decimal),
    HighLow { high: Decimal, low: Decimal },
}

impl FieldUpdate {
    /// Category these values belong to.
    pub fn category(&self) -> Category {
        match self {
            FieldUpdate::Ratio(_) => Category::Ratio,
            FieldUpdate::Price(_) => Category::Price,
            FieldUpdate::HighLow { .. } => Category::HighLow,
        }
    }
}

/// Immutable snapshot produced by one producer iteration.
///
/// Sent once through the aggregation channel, consumed once by the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePayload {
    pub entity_id: EntityId,
    /// Key of the entity the producer was tracking. The applier rejects the
    /// payload if the entity at `entity_id` has since changed key.
    pub entity_key: String,
    pub fields: FieldUpdate,
    pub worker: WorkerId,
}

impl UpdatePayload {
    pub fn category(&self) -> Category {
        self.fields.category()
    }
}

/// Outcome of one step of an asynchronous producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource<T> {
    /// Work has started; no data yet.
    Loading,
    /// A new value.
    Success(T),
    /// The producer failed and will not emit again.
    Error { message: String },
}

impl<T> Resource<T> {
    /// Build an error variant.
    pub fn error(message: impl Into<String>) -> Self {
        Resource::Error {
            message: message.into(),
        }
    }

    /// Whether this is a failure signal. Failure signals are never throttled.
    pub fn is_error(&self) -> bool {
        matches!(self, Resource::Error { .. })
    }
}
