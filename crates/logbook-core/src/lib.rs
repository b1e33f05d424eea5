//! logbook-core - Core library for Logbook
//!
//! This crate contains the entry model, the local store, the remote gateway
//! and the sync engine (queue, reconciliation and trigger coordination) used
//! by every Logbook client.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use models::{Entry, EntryId};
pub use services::{EntryService, LocalStore};
pub use state::{Connectivity, SyncState};
