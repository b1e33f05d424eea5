//! Pending mutation queue processing.

use std::sync::Arc;

use crate::models::{Entry, EntryId, MutationId, PendingMutation, PendingOperation};
use crate::remote::RemoteGateway;
use crate::services::LocalStore;
use crate::Result;

/// Where a submitted change ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The remote acknowledged it directly; carries the server id
    Sent(EntryId),
    /// The remote was skipped or failed; the change waits in the queue
    Queued(MutationId),
}

impl Delivery {
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

/// Outcome of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DrainReport {
    /// Mutations still queued after the drain
    pub const fn remaining(&self) -> usize {
        self.failed
    }
}

/// Delivers queued mutations to the remote, removing only acknowledged ones.
pub struct SyncQueueProcessor<G> {
    store: LocalStore,
    gateway: Arc<G>,
}

impl<G> Clone for SyncQueueProcessor<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<G: RemoteGateway> SyncQueueProcessor<G> {
    pub const fn new(store: LocalStore, gateway: Arc<G>) -> Self {
        Self { store, gateway }
    }

    pub async fn enqueue_create(&self, entry: &Entry) -> Result<PendingMutation> {
        self.store.enqueue(&PendingOperation::create(entry)).await
    }

    pub async fn enqueue_delete(&self, server_id: EntryId) -> Result<PendingMutation> {
        self.store
            .enqueue(&PendingOperation::delete(server_id))
            .await
    }

    /// Send a new entry now when online, queueing it if that is not possible.
    ///
    /// On a direct success the local entry is re-keyed to its server id.
    pub async fn submit_create(&self, entry: &Entry, online: bool) -> Result<Delivery> {
        if online {
            match self.gateway.create(entry).await {
                Ok(created) => {
                    let server_id = self.adopt_server_id(entry.id, &created).await?;
                    return Ok(Delivery::Sent(server_id));
                }
                Err(error) if error.is_network() => {
                    tracing::warn!("Immediate send failed, queueing entry: {error}");
                }
                Err(error) => return Err(error),
            }
        }

        let mutation = self.enqueue_create(entry).await?;
        Ok(Delivery::Queued(mutation.id))
    }

    /// Delete a server entry now when online, queueing the delete otherwise.
    pub async fn submit_delete(&self, server_id: EntryId, online: bool) -> Result<Delivery> {
        if online {
            match self.gateway.remove(server_id).await {
                Ok(()) => return Ok(Delivery::Sent(server_id)),
                Err(error) if error.is_network() => {
                    tracing::warn!("Immediate delete of {server_id} failed, queueing: {error}");
                }
                Err(error) => return Err(error),
            }
        }

        let mutation = self.enqueue_delete(server_id).await?;
        Ok(Delivery::Queued(mutation.id))
    }

    /// Replay every queued mutation oldest-first.
    ///
    /// A failing mutation stays queued and does not stop the ones after it.
    /// An accepted mutation leaves the queue before any local follow-up runs,
    /// so it is never sent twice.
    pub async fn drain(&self) -> Result<DrainReport> {
        let mut report = DrainReport::default();

        for mutation in self.store.pending().await? {
            match &mutation.operation {
                PendingOperation::Delete { server_id } => {
                    match self.gateway.remove(*server_id).await {
                        Ok(()) => self.acknowledge(mutation.id, &mut report).await?,
                        Err(error) if error.is_network() => {
                            tracing::warn!(
                                "Queued delete {} of {server_id} failed: {error}",
                                mutation.id
                            );
                            report.failed += 1;
                        }
                        Err(error) => return Err(error),
                    }
                }
                PendingOperation::Create { entry_id, .. } => {
                    let Some(entry) = mutation.operation.entry() else {
                        continue;
                    };
                    match self.gateway.create(&entry).await {
                        Ok(created) => {
                            self.acknowledge(mutation.id, &mut report).await?;
                            if let Err(error) = self.adopt_server_id(*entry_id, &created).await {
                                tracing::warn!(
                                    "Queued create {} delivered but not re-keyed: {error}",
                                    mutation.id
                                );
                            }
                        }
                        Err(error) if error.is_network() => {
                            tracing::warn!("Queued create {} failed: {error}", mutation.id);
                            report.failed += 1;
                        }
                        Err(error) => return Err(error),
                    }
                }
            }
        }

        if report.delivered > 0 || report.failed > 0 {
            tracing::info!(
                "Drained sync queue: {} delivered, {} still queued",
                report.delivered,
                report.failed
            );
        }
        Ok(report)
    }

    async fn acknowledge(&self, mutation_id: MutationId, report: &mut DrainReport) -> Result<()> {
        self.store.remove_pending(mutation_id).await?;
        report.delivered += 1;
        Ok(())
    }

    /// Re-key the local copy of a created entry.
    ///
    /// A local entry that is gone was deleted while the create was in flight;
    /// the server copy is deleted in turn so reconciliation cannot bring it back.
    async fn adopt_server_id(&self, local_id: Option<EntryId>, created: &Entry) -> Result<EntryId> {
        let Some(server_id) = created.id else {
            return Err(crate::Error::Network(
                "remote create returned no id".to_string(),
            ));
        };

        if let Some(local_id) = local_id {
            match self.store.rekey(local_id, server_id).await {
                Ok(()) => tracing::debug!("Entry {local_id} is now {server_id}"),
                Err(error) if error.is_not_found() => {
                    tracing::info!(
                        "Entry {local_id} was deleted while being created; deleting {server_id}"
                    );
                    self.submit_delete(server_id, true).await?;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(server_id)
    }
}
