//! Reconciliation of local and remote entry sets.
//!
//! The server is the system of record for every id it has seen: on an id
//! collision the remote entry replaces the local one regardless of timestamps.
//! Entries that exist only locally keep their own id and survive the merge.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{sort_newest_first, Entry, EntryId};
use crate::remote::RemoteGateway;
use crate::services::LocalStore;
use crate::Result;

/// Mapping key for the merge.
///
/// Entries without an id are keyed by their position in the local input, in a
/// space disjoint from real ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MergeKey {
    Id(EntryId),
    Unkeyed(usize),
}

/// Merge local and remote entries into one deduplicated, newest-first list.
pub fn merge_entries(local: &[Entry], remote: &[Entry]) -> Vec<Entry> {
    let mut merged: HashMap<MergeKey, Entry> = HashMap::with_capacity(local.len() + remote.len());

    for (position, entry) in local.iter().enumerate() {
        let key = entry.id.map_or(MergeKey::Unkeyed(position), MergeKey::Id);
        merged.insert(key, entry.clone());
    }

    for entry in remote {
        let Some(id) = entry.id else {
            tracing::warn!("Ignoring remote entry without an id: {:?}", entry.name);
            continue;
        };
        merged.insert(MergeKey::Id(id), entry.clone());
    }

    let mut entries = merged.into_values().collect::<Vec<_>>();
    sort_newest_first(&mut entries);
    entries
}

/// How a reconciliation pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Remote state was fetched, merged and persisted
    Merged(Vec<Entry>),
    /// The remote could not be reached; local entries are returned untouched
    LocalOnly(Vec<Entry>),
}

impl Reconciliation {
    pub fn entries(&self) -> &[Entry] {
        match self {
            Self::Merged(entries) | Self::LocalOnly(entries) => entries,
        }
    }

    pub fn into_entries(self) -> Vec<Entry> {
        match self {
            Self::Merged(entries) | Self::LocalOnly(entries) => entries,
        }
    }

    pub const fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

/// Fetches remote state and folds it into the local store.
pub struct Reconciler<G> {
    store: LocalStore,
    gateway: Arc<G>,
}

impl<G> Clone for Reconciler<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: RemoteGateway> Reconciler<G> {
    pub const fn new(store: LocalStore, gateway: Arc<G>) -> Self {
        Self { store, gateway }
    }

    /// Run one fetch + merge + persist pass.
    ///
    /// A failed fetch never touches local data. Storage failures are returned.
    pub async fn reconcile(&self) -> Result<Reconciliation> {
        let mut remote = match self.gateway.fetch_all().await {
            Ok(remote) => remote,
            Err(error) => {
                tracing::warn!("Reconciliation fetch failed, using local data: {error}");
                return Ok(Reconciliation::LocalOnly(self.store.get_all().await?));
            }
        };

        // A delete still waiting in the queue is newer than the remote copy.
        let deleted = self.store.pending_delete_targets().await?;
        if !deleted.is_empty() {
            remote.retain(|entry| !matches!(entry.id, Some(id) if deleted.contains(&id)));
        }

        let merged = self.store.merge_remote(&remote).await?;
        tracing::info!(
            "Reconciled {} remote entries into {} local entries",
            remote.len(),
            merged.len()
        );
        Ok(Reconciliation::Merged(merged))
    }
}
