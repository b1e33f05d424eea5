//! User-facing entry operations.
//!
//! Every operation commits locally first and returns the canonical list after
//! it ran. Remote delivery is attempted right away when online and otherwise
//! deferred to the sync queue.

use std::sync::Arc;

use crate::models::{is_server_id, Entry, EntryId};
use crate::remote::RemoteGateway;
use crate::services::LocalStore;
use crate::state::Connectivity;
use crate::sync::{PassOutcome, ReplaySource, SyncCoordinator, SyncEvent};
use crate::util::normalize_text_option;
use crate::{Error, Result};

pub struct EntryService<G> {
    store: LocalStore,
    coordinator: Arc<SyncCoordinator<G>>,
}

impl<G> Clone for EntryService<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<G: RemoteGateway> EntryService<G> {
    pub fn new(store: LocalStore, gateway: Arc<G>, connectivity: Connectivity) -> Self {
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), gateway, connectivity));
        Self { store, coordinator }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn coordinator(&self) -> &Arc<SyncCoordinator<G>> {
        &self.coordinator
    }

    /// All entries newest-first.
    pub async fn list_entries(&self) -> Result<Vec<Entry>> {
        self.store.get_all().await
    }

    /// Record a new entry and try to deliver it.
    ///
    /// A failed delivery queues the entry and still succeeds.
    pub async fn create_entry(&self, name: &str, activity: &str) -> Result<Vec<Entry>> {
        let name = required("name", name)?;
        let activity = required("activity", activity)?;

        let entry = self.store.add(&name, &activity).await?;
        let online = self.coordinator.is_online();
        let delivery = self.coordinator.queue().submit_create(&entry, online).await?;

        if delivery.is_queued() {
            tracing::debug!("Entry for {name} queued for delivery");
            if online {
                self.coordinator.request_replay(ReplaySource::BackgroundSync);
            }
        }
        self.list_entries().await
    }

    /// Delete an entry locally and remotely. Unknown ids are a no-op.
    pub async fn delete_entry(&self, id: EntryId) -> Result<Vec<Entry>> {
        match self.store.get(id).await {
            Ok(_) => {}
            Err(error) if error.is_not_found() => {
                tracing::debug!("Delete of unknown entry {id} ignored");
                return self.list_entries().await;
            }
            Err(error) => return Err(error),
        }

        self.store.delete(id).await?;

        if is_server_id(id) {
            let online = self.coordinator.is_online();
            let delivery = self.coordinator.queue().submit_delete(id, online).await?;
            if delivery.is_queued() && online {
                self.coordinator.request_replay(ReplaySource::BackgroundSync);
            }
        } else if self.store.cancel_pending_create(id).await? {
            tracing::debug!("Cancelled queued create of unsynced entry {id}");
        }

        self.list_entries().await
    }

    /// Reconcile and drain now; returns the list even when the pass was skipped.
    pub async fn sync_now(&self) -> Result<Vec<Entry>> {
        match self.coordinator.sync_now().await? {
            PassOutcome::Completed(report) => Ok(report.entries),
            PassOutcome::Coalesced | PassOutcome::Skipped(_) => self.list_entries().await,
        }
    }

    pub async fn handle_event(&self, event: SyncEvent) -> Result<PassOutcome> {
        self.coordinator.handle_event(event).await
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    normalize_text_option(Some(value.to_string()))
        .ok_or_else(|| Error::InvalidInput(format!("{field} must not be empty")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PendingOperation;
    use crate::testing::FakeGateway;
    use pretty_assertions::assert_eq;

    async fn service(
        connectivity: Connectivity,
    ) -> (EntryService<FakeGateway>, Arc<FakeGateway>) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let gateway = Arc::new(FakeGateway::new());
        (
            EntryService::new(store, Arc::clone(&gateway), connectivity),
            gateway,
        )
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        let mut names: Vec<_> = entries.iter().map(|entry| entry.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn created_entries_are_listed_newest_first() {
        let (service, _gateway) = service(Connectivity::Offline).await;

        for name in ["Ana", "Ben", "Cy"] {
            service.create_entry(name, "reading").await.unwrap();
        }

        let entries = service.list_entries().await.unwrap();
        assert_eq!(names(&entries), vec!["Ana", "Ben", "Cy"]);
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_fields_are_rejected_before_storing() {
        let (service, _gateway) = service(Connectivity::Offline).await;

        let error = service.create_entry("  ", "reading").await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(service.create_entry("Ana", "").await.is_err());
        assert!(service.list_entries().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_trims_input() {
        let (service, _gateway) = service(Connectivity::Offline).await;

        let entries = service.create_entry(" Ana ", " chess\n").await.unwrap();
        assert_eq!(entries[0].name, "Ana");
        assert_eq!(entries[0].activity, "chess");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_create_is_delivered_without_queueing() {
        let (service, gateway) = service(Connectivity::Online).await;

        let entries = service.create_entry("Ana", "chess").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].has_server_id());
        assert_eq!(gateway.entries().len(), 1);
        assert!(service.store().pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_fast_path_still_succeeds_and_queues() {
        let (service, gateway) = service(Connectivity::Online).await;
        gateway.set_reachable(false);

        let entries = service.create_entry("Ana", "chess").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].has_server_id());
        assert_eq!(service.store().pending().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_create_is_delivered_after_reconnect() {
        let (service, gateway) = service(Connectivity::Offline).await;

        let entries = service.create_entry("Ana", "X").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(service.store().pending().await.unwrap().len(), 1);
        assert_eq!(gateway.create_calls(), 0);

        service
            .handle_event(SyncEvent::ConnectivityChanged(Connectivity::Online))
            .await
            .unwrap();
        let entries = service.sync_now().await.unwrap();

        assert!(service.store().pending().await.unwrap().is_empty());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].activity, "X");
        assert!(entries[0].has_server_id());
        assert_eq!(gateway.entries().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_twice_is_silent() {
        let (service, _gateway) = service(Connectivity::Offline).await;
        service.create_entry("Ana", "chess").await.unwrap();
        let kept = service.create_entry("Ben", "chess").await.unwrap();
        let target = kept.iter().find(|entry| entry.name == "Ana").unwrap();
        let id = target.id.unwrap();

        let after_first = service.delete_entry(id).await.unwrap();
        let after_second = service.delete_entry(id).await.unwrap();

        assert_eq!(names(&after_first), vec!["Ben"]);
        assert_eq!(after_first, after_second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_unsynced_entry_cancels_its_create() {
        let (service, gateway) = service(Connectivity::Offline).await;
        let entries = service.create_entry("Ana", "chess").await.unwrap();

        service.delete_entry(entries[0].id.unwrap()).await.unwrap();

        assert!(service.store().pending().await.unwrap().is_empty());
        service
            .handle_event(SyncEvent::ConnectivityChanged(Connectivity::Online))
            .await
            .unwrap();
        assert_eq!(gateway.create_calls(), 0);
        assert_eq!(gateway.remove_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_delete_of_server_entry_survives_reconnect() {
        let (service, gateway) = service(Connectivity::Offline).await;
        let synced = Entry::new("Ana", "chess").with_id(5);
        gateway.seed(synced.clone());
        service.store().replace_all(&[synced]).await.unwrap();

        let entries = service.delete_entry(5).await.unwrap();
        assert!(entries.is_empty());
        let pending = service.store().pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, PendingOperation::delete(5));

        service
            .handle_event(SyncEvent::ConnectivityChanged(Connectivity::Online))
            .await
            .unwrap();

        assert!(service.list_entries().await.unwrap().is_empty());
        assert!(gateway.entries().is_empty());
        assert!(service.store().pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn online_delete_reaches_remote_directly() {
        let (service, gateway) = service(Connectivity::Online).await;
        let entries = service.create_entry("Ana", "chess").await.unwrap();

        service.delete_entry(entries[0].id.unwrap()).await.unwrap();

        assert!(gateway.entries().is_empty());
        assert_eq!(gateway.remove_calls(), 1);
        assert!(service.store().pending().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_now_offline_returns_local_list() {
        let (service, gateway) = service(Connectivity::Offline).await;
        service.create_entry("Ana", "chess").await.unwrap();

        let entries = service.sync_now().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(gateway.create_calls(), 0);
    }

    /// Remote that lets the user delete the entry before answering its create.
    struct DeleteDuringCreate {
        store: LocalStore,
        inner: FakeGateway,
    }

    impl RemoteGateway for DeleteDuringCreate {
        async fn create(&self, entry: &Entry) -> Result<Entry> {
            if let Some(id) = entry.id {
                self.store.delete(id).await?;
                self.store.cancel_pending_create(id).await?;
            }
            self.inner.create(entry).await
        }

        async fn remove(&self, server_id: EntryId) -> Result<()> {
            self.inner.remove(server_id).await
        }

        async fn fetch_all(&self) -> Result<Vec<Entry>> {
            self.inner.fetch_all().await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn entry_deleted_while_its_create_is_in_flight_stays_deleted() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let gateway = Arc::new(DeleteDuringCreate {
            store: store.clone(),
            inner: FakeGateway::new(),
        });
        let service = EntryService::new(store, Arc::clone(&gateway), Connectivity::Offline);
        service.create_entry("Ana", "chess").await.unwrap();

        service
            .handle_event(SyncEvent::ConnectivityChanged(Connectivity::Online))
            .await
            .unwrap();
        let entries = service.sync_now().await.unwrap();

        assert!(entries.is_empty());
        assert_eq!(gateway.inner.create_calls(), 1);
        assert!(gateway.inner.entries().is_empty());
        assert!(service.store().pending().await.unwrap().is_empty());
    }
}
