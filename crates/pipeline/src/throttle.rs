//! Per-producer emission throttling.
//!
//! A throttle lets an item through when at least `window` has passed since
//! the last item it let through. Everything in between is dropped; nothing is
//! buffered. Error signals always pass so a failing producer is never
//! silenced.

use futures::future;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tickersim_types::Resource;
use tokio::time::Instant;

/// Minimum-interval rate limiter for a single producer.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_emission: Option<Instant>,
}

impl Throttle {
    /// Create a throttle that admits at most one item per `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emission: None,
        }
    }

    /// Configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether an item observed now may be emitted.
    pub fn admit(&mut self, is_error: bool) -> bool {
        self.admit_at(Instant::now(), is_error)
    }

    /// Decide whether an item observed at `now` may be emitted.
    ///
    /// Admitted items, errors included, restart the window.
    pub fn admit_at(&mut self, now: Instant, is_error: bool) -> bool {
        let open = match self.last_emission {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        };

        if open || is_error {
            self.last_emission = Some(now);
            true
        } else {
            false
        }
    }
}

/// Throttle a producer's resource stream to at most one item per `window`.
///
/// Error items are always forwarded.
pub fn throttle_updates<S, T>(stream: S, window: Duration) -> impl Stream<Item = Resource<T>>
where
    S: Stream<Item = Resource<T>>,
{
    let mut throttle = Throttle::new(window);
    stream.filter(move |item| future::ready(throttle.admit(item.is_error())))
}
