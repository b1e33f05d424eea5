//! Database layer for Logbook

mod connection;
mod entry_repository;
mod lease_repository;
mod migrations;
mod mutation_repository;

pub use connection::Database;
pub use entry_repository::{EntryRepository, LibSqlEntryRepository};
pub use lease_repository::{LibSqlSyncLeaseRepository, SyncLeaseRepository};
pub use mutation_repository::{LibSqlMutationRepository, MutationRepository};
