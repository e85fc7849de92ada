//! Entity sources.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::future::Future;
use tickersim_pipeline::EntityLookup;
use tickersim_types::{Entity, EntityId, Quote};
use tracing::debug;

/// Where entities come from.
///
/// Producers look entities up by key through [`EntityLookup`]; the
/// controller asks for a fresh set on every populate. Indices in a
/// regenerated set must be contiguous from zero and keys unique.
pub trait EntitySource: EntityLookup + 'static {
    /// Current entity set, in index order.
    fn entities(&self) -> Vec<Entity>;

    /// Replace the current set with `count` fresh entities and return it.
    fn regenerate(&self, count: usize) -> impl Future<Output = Vec<Entity>> + Send;
}

struct Listing {
    symbol: &'static str,
    name: &'static str,
    ratio: &'static str,
    /// Prices in cents: opening, closing, low, high, current.
    cents: [i64; 5],
}

const fn listing(
    symbol: &'static str,
    name: &'static str,
    ratio: &'static str,
    cents: [i64; 5],
) -> Listing {
    Listing {
        symbol,
        name,
        ratio,
        cents,
    }
}

const CATALOG: &[Listing] = &[
    listing("AAPL", "Apple Inc.", "28.5", [14800, 15000, 14700, 15100, 14950]),
    listing("MSFT", "Microsoft Corp.", "35.4", [25800, 26000, 25700, 26100, 25950]),
    listing("AMZN", "Amazon.com Inc.", "60.2", [338000, 340000, 337000, 341000, 339500]),
    listing("GOOGL", "Alphabet Inc.", "30.1", [238000, 240000, 237000, 241000, 239500]),
    listing("META", "Meta Platforms Inc.", "24.8", [31800, 32000, 31700, 32100, 31950]),
    listing("TSLA", "Tesla Inc.", "130.6", [79000, 80000, 78500, 80500, 79500]),
    listing("NVDA", "NVIDIA Corp.", "50.3", [59000, 60000, 58500, 60500, 59500]),
    listing("PYPL", "PayPal Holdings Inc.", "45.1", [18500, 19000, 18300, 19200, 18850]),
    listing("INTC", "Intel Corp.", "12.5", [4900, 5000, 4850, 5100, 4950]),
    listing("NFLX", "Netflix Inc.", "80.4", [49000, 50000, 48500, 50500, 49500]),
    listing("ADBE", "Adobe Inc.", "40.7", [46000, 47000, 45500, 47500, 46500]),
    listing("CRM", "Salesforce Inc.", "100.1", [24500, 25000, 24300, 25200, 24750]),
    listing("CSCO", "Cisco Systems Inc.", "18.3", [5400, 5500, 5350, 5600, 5450]),
    listing("ORCL", "Oracle Corp.", "22.4", [7800, 8000, 7750, 8100, 7900]),
    listing("IBM", "IBM Corp.", "15.6", [12800, 13000, 12700, 13100, 12950]),
    listing("QCOM", "Qualcomm Inc.", "23.7", [14800, 15000, 14700, 15100, 14900]),
    listing("SHOP", "Shopify Inc.", "210.0", [128000, 130000, 127500, 131000, 129500]),
    listing("SQ", "Block Inc.", "150.3", [26500, 27000, 26000, 27500, 26750]),
    listing("TWTR", "Twitter Inc.", "80.9", [6800, 7000, 6700, 7200, 6900]),
    listing("AMD", "Advanced Micro Devices Inc.", "44.2", [10800, 11000, 10700, 11200, 10950]),
];

/// Number of distinct listings [`CatalogSource`] cycles through.
pub const CATALOG_LEN: usize = CATALOG.len();

/// Entity source backed by a fixed ticker catalog.
///
/// Sets larger than the catalog wrap around it; every wrap after the first
/// appends the lap number to the key (`AAPL`, ..., `AAPL.1`, ...), so keys
/// stay unique.
#[derive(Default)]
pub struct CatalogSource {
    entities: RwLock<Vec<Entity>>,
}

impl CatalogSource {
    /// A source with no entities until the first regenerate.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source pre-populated with `count` entities.
    pub fn with_count(count: usize) -> Self {
        Self {
            entities: RwLock::new(generate(count)),
        }
    }
}

fn generate(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|index| {
            let entry = &CATALOG[index % CATALOG.len()];
            let lap = index / CATALOG.len();
            let key = if lap == 0 {
                entry.symbol.to_string()
            } else {
                format!("{}.{}", entry.symbol, lap)
            };
            let [opening, closing, low, high, current] = entry.cents.map(|c| Decimal::new(c, 2));

            Entity {
                id: EntityId(index),
                key,
                name: entry.name.to_string(),
                ratio: entry.ratio.to_string(),
                quote: Quote {
                    current,
                    high,
                    low,
                    opening,
                    closing,
                },
                last_worker: None,
            }
        })
        .collect()
}

impl EntityLookup for CatalogSource {
    fn find(&self, key: &str) -> Option<Entity> {
        self.entities.read().iter().find(|e| e.key == key).cloned()
    }
}

impl EntitySource for CatalogSource {
    fn entities(&self) -> Vec<Entity> {
        self.entities.read().clone()
    }

    async fn regenerate(&self, count: usize) -> Vec<Entity> {
        let entities = generate(count);
        *self.entities.write() = entities.clone();
        debug!(count, "Regenerated catalog entities");
        entities
    }
}
