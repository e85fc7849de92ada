//! Deterministic fixtures shared by the workspace's tests.

use rust_decimal::Decimal;
use tickersim_types::{Entity, EntityId, Quote};

/// A single entity at index `id` with key `key` and round-number prices.
pub fn fixture_entity(id: usize, key: &str) -> Entity {
    let base = Decimal::from(100 + id as i64 * 10);
    Entity {
        id: EntityId(id),
        key: key.to_string(),
        name: format!("{key} Holdings"),
        ratio: format!("{}.5", 10 + id),
        quote: Quote {
            current: base,
            high: base + Decimal::ONE,
            low: base - Decimal::ONE,
            opening: base,
            closing: base,
        },
        last_worker: None,
    }
}

/// `n` entities with contiguous ids and keys `T0`, `T1`, ...
pub fn fixture_entities(n: usize) -> Vec<Entity> {
    (0..n).map(|i| fixture_entity(i, &format!("T{i}"))).collect()
}
