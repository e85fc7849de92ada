//! Update producers: one per (entity, category).
//!
//! A producer is a stream of [`Resource`]s. It yields `Loading` once, then on
//! every iteration looks its entity up by key, waits the category's live
//! interval, derives the next field values and yields them as `Success`.
//! The first failure is yielded as `Error` and ends the stream; producers do
//! not retry.
//!
//! [`drive`] runs a producer stream to completion, forwarding successes into
//! the aggregation channel and failures to the error signal, until the
//! stream ends or its cancellation token fires.

use crate::board::EntityLookup;
use crate::channel::{Delivery, Sender};
use crate::error::ProducerError;
use crate::settings::LiveSettings;
use crate::signal::ErrorSignal;
use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tickersim_stats::StatAggregator;
use tickersim_types::{round_price, Category, Entity, FieldUpdate, Resource, UpdatePayload, WorkerId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Refreshes one category of one entity.
pub struct UpdateProducer {
    key: String,
    category: Category,
    lookup: Arc<dyn EntityLookup>,
    settings: Arc<LiveSettings>,
    stats: Arc<StatAggregator>,
    /// Last emitted values; seeds from the entity on the first iteration.
    last: Option<FieldUpdate>,
}

enum Phase {
    Start,
    Running,
    Done,
}

impl UpdateProducer {
    pub fn new(
        key: impl Into<String>,
        category: Category,
        lookup: Arc<dyn EntityLookup>,
        settings: Arc<LiveSettings>,
        stats: Arc<StatAggregator>,
    ) -> Self {
        Self {
            key: key.into(),
            category,
            lookup,
            settings,
            stats,
            last: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Turn the producer into its resource stream.
    pub fn into_stream(self) -> impl Stream<Item = Resource<UpdatePayload>> + Send {
        futures::stream::unfold((self, Phase::Start), |(mut producer, phase)| async move {
            match phase {
                Phase::Start => Some((Resource::Loading, (producer, Phase::Running))),
                Phase::Running => match producer.step().await {
                    Ok(payload) => Some((Resource::Success(payload), (producer, Phase::Running))),
                    Err(e) => {
                        warn!(
                            key = %producer.key,
                            category = %producer.category,
                            error = %e,
                            "Producer stopped"
                        );
                        Some((Resource::error(e.to_string()), (producer, Phase::Done)))
                    }
                },
                Phase::Done => None,
            }
        })
    }

    /// One iteration: lookup, wait, derive, record.
    async fn step(&mut self) -> Result<UpdatePayload, ProducerError> {
        let started = Instant::now();

        let entity = self
            .lookup
            .find(&self.key)
            .ok_or_else(|| ProducerError::NotFound {
                key: self.key.clone(),
            })?;

        tokio::time::sleep(self.settings.interval(self.category)).await;

        let base = match self.last.take() {
            Some(last) => last,
            None => current_fields(self.category, &entity),
        };
        let fields = advance(&self.key, base)?;
        self.last = Some(fields.clone());

        // Whichever pool thread resumed this task after the wait did the work.
        let worker = WorkerId::current();
        self.stats
            .record_update(&worker, self.category, started.elapsed());

        Ok(UpdatePayload {
            entity_id: entity.id,
            entity_key: entity.key,
            fields,
            worker,
        })
    }
}

/// The entity's current values for `category`.
fn current_fields(category: Category, entity: &Entity) -> FieldUpdate {
    match category {
        Category::Ratio => FieldUpdate::Ratio(entity.ratio.clone()),
        Category::Price => FieldUpdate::Price(entity.quote.current),
        Category::HighLow => FieldUpdate::HighLow {
            high: entity.quote.high,
            low: entity.quote.low,
        },
    }
}

/// Synthetic monotonic transform: ratio +1, price +1, high +2 / low +1.
fn advance(key: &str, fields: FieldUpdate) -> Result<FieldUpdate, ProducerError> {
    Ok(match fields {
        FieldUpdate::Ratio(ratio) => {
            let value =
                Decimal::from_str(ratio.trim()).map_err(|_| ProducerError::InvalidRatio {
                    key: key.to_string(),
                    value: ratio.clone(),
                })?;
            FieldUpdate::Ratio((value + Decimal::ONE).to_string())
        }
        FieldUpdate::Price(current) => FieldUpdate::Price(round_price(current + Decimal::ONE)),
        FieldUpdate::HighLow { high, low } => FieldUpdate::HighLow {
            high: round_price(high + Decimal::TWO),
            low: round_price(low + Decimal::ONE),
        },
    })
}

/// Run a producer stream until it ends or `cancel` fires.
///
/// Cancellation is checked before every item, which covers the wait inside
/// each iteration. Sends never block, so an item that was produced is
/// always handed to the channel before the next cancellation check.
pub async fn drive<S>(
    stream: S,
    sender: Sender<UpdatePayload>,
    errors: ErrorSignal,
    cancel: CancellationToken,
) where
    S: Stream<Item = Resource<UpdatePayload>>,
{
    let mut stream = std::pin::pin!(stream);

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };

        match item {
            None => break,
            Some(Resource::Loading) => {}
            Some(Resource::Success(payload)) => match sender.send(payload) {
                Ok(Delivery::Queued) => {}
                Ok(Delivery::QueuedEvicting(dropped)) => {
                    trace!(entity = %dropped.entity_id, "Dropped oldest queued update");
                }
                Err(_) => {
                    debug!("Aggregation channel closed, producer exiting");
                    break;
                }
            },
            Some(Resource::Error { message }) => {
                errors.raise(message);
            }
        }
    }
}
