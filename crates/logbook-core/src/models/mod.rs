//! Data models for Logbook

mod entry;
mod mutation;

pub use entry::{is_server_id, sort_newest_first, Entry, EntryId};
pub use mutation::{MutationId, PendingMutation, PendingOperation};
