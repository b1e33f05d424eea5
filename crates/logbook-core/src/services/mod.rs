//! Shared service layer used by clients.

mod entries;
mod store;

pub use entries::EntryService;
pub use store::{open_shared, reset_shared, LocalStore};
