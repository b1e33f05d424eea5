//! Shared local store used by the sync engine and every client.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::db::{
    Database, EntryRepository, LibSqlEntryRepository, LibSqlMutationRepository,
    LibSqlSyncLeaseRepository, MutationRepository, SyncLeaseRepository,
};
use crate::models::{Entry, EntryId, MutationId, PendingMutation, PendingOperation};
use crate::reconcile::merge_entries;
use crate::util::unix_millis_now;
use crate::Result;

static SHARED_STORE: LazyLock<Mutex<Option<LocalStore>>> = LazyLock::new(|| Mutex::new(None));

/// Open the process-wide store, or return it if it is already open.
///
/// The path is only consulted on first open.
pub async fn open_shared(db_path: impl Into<PathBuf>) -> Result<LocalStore> {
    let db_path = db_path.into();
    let mut slot = SHARED_STORE.lock().await;

    if let Some(store) = slot.as_ref() {
        if store.db_path() != Some(db_path.as_path()) {
            tracing::warn!(
                "Shared store already open at {:?}; ignoring {}",
                store.db_path(),
                db_path.display()
            );
        }
        return Ok(store.clone());
    }

    let store = LocalStore::open_path(db_path).await?;
    *slot = Some(store.clone());
    Ok(store)
}

/// Forget the process-wide store so the next `open_shared` opens a fresh one.
pub async fn reset_shared() {
    SHARED_STORE.lock().await.take();
}

/// Thread-safe handle over the entries collection and the mutation queue.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::info!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Store a new entry; the returned entry carries its local id.
    pub async fn add(&self, name: &str, activity: &str) -> Result<Entry> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.add(name, activity).await
    }

    /// Fetch one entry.
    pub async fn get(&self, id: EntryId) -> Result<Entry> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.get(id).await
    }

    /// All entries newest-first.
    pub async fn get_all(&self) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.list().await
    }

    /// Delete an entry. Deleting an id that is not stored is a no-op.
    pub async fn delete(&self, id: EntryId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        if !repo.delete(id).await? {
            tracing::debug!("Delete of absent entry {id} ignored");
        }
        Ok(())
    }

    /// Remove every committed entry.
    pub async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.clear().await
    }

    /// Replace all entries, best-effort per entry. Returns how many were stored.
    pub async fn replace_all(&self, entries: &[Entry]) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.replace_all(entries).await
    }

    /// Point a locally created entry at its server id.
    pub async fn rekey(&self, local_id: EntryId, server_id: EntryId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());
        repo.rekey(local_id, server_id).await
    }

    /// Merge remote entries into the local set and persist the result.
    ///
    /// Reading, clearing and replacing happen under one lock so an entry added
    /// concurrently is either part of the merge input or added afterwards.
    pub async fn merge_remote(&self, remote: &[Entry]) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let local = repo.list().await?;
        let merged = merge_entries(&local, remote);

        // replace_all clears inside its own transaction, so a failure here
        // leaves the previous entries in place.
        let stored = repo.replace_all(&merged).await?;
        if stored < merged.len() {
            tracing::warn!(
                "Reconciliation stored {stored} of {} merged entries",
                merged.len()
            );
        }

        repo.list().await
    }

    /// Append a mutation to the pending queue.
    pub async fn enqueue(&self, operation: &PendingOperation) -> Result<PendingMutation> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.enqueue(operation).await
    }

    /// Pending mutations, oldest first.
    pub async fn pending(&self) -> Result<Vec<PendingMutation>> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.list().await
    }

    /// Drop an acknowledged mutation.
    pub async fn remove_pending(&self, id: MutationId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.remove(id).await
    }

    /// Drop the queued create of a local entry that never reached the server.
    pub async fn cancel_pending_create(&self, entry_id: EntryId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.cancel_create(entry_id).await
    }

    /// Server ids the user deleted locally whose delete is still queued.
    pub async fn pending_delete_targets(&self) -> Result<Vec<EntryId>> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.delete_targets().await
    }

    /// Take the sync lease shared by every handle on this database file.
    ///
    /// Returns false while another holder's lease is unexpired.
    pub async fn claim_sync_lease(&self, holder: &str, ttl: Duration) -> Result<bool> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let db = self.db.lock().await;
        let repo = LibSqlSyncLeaseRepository::new(db.connection());
        repo.try_claim(holder, unix_millis_now(), ttl_ms).await
    }

    pub async fn release_sync_lease(&self, holder: &str) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncLeaseRepository::new(db.connection());
        if !repo.release(holder).await? {
            tracing::debug!("Sync lease for {holder} had already lapsed");
        }
        Ok(())
    }
}
