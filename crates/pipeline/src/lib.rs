//! The update pipeline.
//!
//! ```text
//!  UpdateProducer ──┐
//!  UpdateProducer ──┼──► aggregation channel (drop-oldest) ──► UpdateApplier ──► EntityBoard
//!  UpdateProducer ──┘
//! ```
//!
//! Producers run concurrently on the runtime's worker pool and never touch
//! entity state. The applier is the only task that writes to the
//! [`EntityBoard`] while the simulation runs.

mod applier;
mod board;
mod channel;
mod error;
mod producer;
mod settings;
mod signal;
mod throttle;

pub use applier::{apply, Applied, UpdateApplier, APPLY_FAILED_MESSAGE, INTERNAL_ERROR_MESSAGE};
pub use board::{EntityBoard, EntityLookup};
pub use channel::{
    aggregation_channel, Delivery, QueueDepth, Receiver, Sender, DEFAULT_CHANNEL_CAPACITY,
};
pub use error::{ApplyError, ChannelClosed, ParseSettingError, ProducerError, SettingError};
pub use producer::{drive, UpdateProducer};
pub use settings::{LiveSettings, Setting};
pub use signal::ErrorSignal;
pub use throttle::{throttle_updates, Throttle};
