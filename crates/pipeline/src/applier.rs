//! The single writer of live entity state.
//!
//! The applier owns the aggregation channel's receiver. It takes payloads in
//! FIFO order, keeps the queue-depth gauge in step, and writes each payload
//! into the entity board. A payload whose entity has since changed key is
//! rejected and reported; a payload addressing an index past the end of the
//! board is skipped silently, since that only happens after a shrinking
//! repopulate.

use crate::board::EntityBoard;
use crate::channel::{QueueDepth, Receiver};
use crate::error::ApplyError;
use crate::signal::ErrorSignal;
use std::sync::Arc;
use tickersim_types::UpdatePayload;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Message raised when a single payload cannot be applied.
pub const APPLY_FAILED_MESSAGE: &str = "Failed to update entity";

/// Message raised when the channel closes underneath a running applier.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal processing error";

/// Outcome of applying one payload.
#[derive(Debug, PartialEq, Eq)]
pub enum Applied {
    Written,
    /// The payload's index no longer exists.
    OutOfRange,
}

pub struct UpdateApplier {
    receiver: Receiver<UpdatePayload>,
    board: EntityBoard,
    depth: Arc<dyn QueueDepth>,
    errors: ErrorSignal,
    cancel: CancellationToken,
}

impl UpdateApplier {
    pub fn new(
        receiver: Receiver<UpdatePayload>,
        board: EntityBoard,
        depth: Arc<dyn QueueDepth>,
        errors: ErrorSignal,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            board,
            depth,
            errors,
            cancel,
        }
    }

    /// Consume payloads until cancelled or the channel closes.
    ///
    /// On cancellation, whatever is already queued is applied before
    /// returning. Hands the receiver back so the next run can reuse the
    /// channel.
    pub async fn run(mut self) -> Receiver<UpdatePayload> {
        debug!("Applier started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    let mut flushed = 0usize;
                    while let Some(payload) = self.receiver.try_recv() {
                        self.handle(payload);
                        flushed += 1;
                    }
                    debug!(flushed, "Applier cancelled");
                    break;
                }

                next = self.receiver.recv() => match next {
                    Some(payload) => self.handle(payload),
                    None => {
                        error!("Aggregation channel closed while applier was running");
                        self.errors.raise(INTERNAL_ERROR_MESSAGE);
                        break;
                    }
                },
            }
        }

        self.receiver
    }

    fn handle(&self, payload: UpdatePayload) {
        self.depth.decrement();

        if let Err(e) = apply(&self.board, &payload) {
            warn!(error = %e, category = %payload.category(), "Rejected update");
            self.errors.raise(APPLY_FAILED_MESSAGE);
        }
    }
}

/// Write one payload into the board.
pub fn apply(board: &EntityBoard, payload: &UpdatePayload) -> Result<Applied, ApplyError> {
    let result = board.with_entity_mut(payload.entity_id, |entity| {
        if entity.key != payload.entity_key {
            return Err(ApplyError::KeyMismatch {
                id: payload.entity_id,
                expected: payload.entity_key.clone(),
                found: entity.key.clone(),
            });
        }
        entity.apply(&payload.fields, &payload.worker);
        Ok(())
    });

    match result {
        Some(Ok(())) => Ok(Applied::Written),
        Some(Err(e)) => Err(e),
        None => Ok(Applied::OutOfRange),
    }
}
