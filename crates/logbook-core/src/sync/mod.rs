//! Deferred delivery of local changes to the remote API.

mod coordinator;
mod queue;

pub use coordinator::{
    PassOutcome, PassReport, ReplaySource, SkipReason, SyncCoordinator, SyncEvent,
};
pub use queue::{Delivery, DrainReport, SyncQueueProcessor};
