//! Simulated stock-like entities.

use crate::{EntityId, FieldUpdate, WorkerId};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept on every price.
pub const PRICE_SCALE: u32 = 2;

/// Round a price to [`PRICE_SCALE`] places, half away from zero.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Price fields of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub current: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub opening: Decimal,
    pub closing: Decimal,
}

/// One simulated stock-like record.
///
/// Producers never touch an `Entity` directly; they read a copy from the
/// entity source and emit [`crate::UpdatePayload`]s. Only the applier
/// mutates live entity state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable index in the current entity set.
    pub id: EntityId,
    /// Unique symbolic key (ticker symbol).
    pub key: String,
    /// Display name.
    pub name: String,
    /// Ratio value (price/earnings), kept as a decimal string.
    pub ratio: String,
    /// Price fields.
    pub quote: Quote,
    /// Worker that last wrote this entity, if any.
    pub last_worker: Option<WorkerId>,
}

impl Entity {
    /// Apply one category's field values and the writing worker.
    pub fn apply(&mut self, fields: &FieldUpdate, worker: &WorkerId) {
        match fields {
            FieldUpdate::Ratio(ratio) => self.ratio.clone_from(ratio),
            FieldUpdate::Price(current) => self.quote.current = *current,
            FieldUpdate::HighLow { high, low } => {
                self.quote.high = *high;
                self.quote.low = *low;
            }
        }
        self.last_worker = Some(worker.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Entity {
        Entity {
            id: EntityId(0),
            key: "AAPL".into(),
            name: "Apple Inc.".into(),
            ratio: "28.5".into(),
            quote: Quote {
                current: Decimal::from_str("149.50").unwrap(),
                high: Decimal::from_str("151.00").unwrap(),
                low: Decimal::from_str("147.00").unwrap(),
                opening: Decimal::from_str("148.00").unwrap(),
                closing: Decimal::from_str("150.00").unwrap(),
            },
            last_worker: None,
        }
    }

    #[test]
    fn test_apply_touches_only_category_fields() {
        let mut entity = sample();
        let worker = WorkerId::new(1, "w");

        entity.apply(
            &FieldUpdate::HighLow {
                high: Decimal::from(153),
                low: Decimal::from(148),
            },
            &worker,
        );

        assert_eq!(entity.quote.high, Decimal::from(153));
        assert_eq!(entity.quote.low, Decimal::from(148));
        assert_eq!(entity.quote.current, Decimal::from_str("149.50").unwrap());
        assert_eq!(entity.ratio, "28.5");
        assert_eq!(entity.last_worker, Some(worker));
    }

    #[test]
    fn test_round_price_half_up() {
        assert_eq!(
            round_price(Decimal::from_str("1.005").unwrap()),
            Decimal::from_str("1.01").unwrap()
        );
        assert_eq!(
            round_price(Decimal::from_str("2.004").unwrap()),
            Decimal::from_str("2.00").unwrap()
        );
    }
}
