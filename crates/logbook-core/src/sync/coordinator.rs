//! Connectivity and replay coordination.
//!
//! Every trigger funnels into one pass: reconcile with the remote, drain the
//! queue, then read the canonical list back. At most one pass runs at a time
//! per database file, across processes; a trigger that arrives while one is in
//! flight is dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};

use super::queue::{DrainReport, SyncQueueProcessor};
use crate::models::Entry;
use crate::reconcile::Reconciler;
use crate::remote::RemoteGateway;
use crate::services::LocalStore;
use crate::state::{Connectivity, SyncState};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// How long a pass may hold the store's sync lease before others may take it.
const PASS_LEASE_TTL: Duration = Duration::from_secs(300);

static NEXT_COORDINATOR: AtomicU64 = AtomicU64::new(1);

/// Lease holder name unique to one coordinator in one process.
fn lease_holder() -> String {
    format!(
        "{}:{}:{}",
        std::process::id(),
        unix_millis_now(),
        NEXT_COORDINATOR.fetch_add(1, Ordering::Relaxed)
    )
}

/// Who asked for a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaySource {
    BackgroundSync,
    Startup,
    Timer,
    Manual,
}

impl fmt::Display for ReplaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BackgroundSync => "background sync",
            Self::Startup => "startup",
            Self::Timer => "timer",
            Self::Manual => "manual sync",
        };
        f.write_str(label)
    }
}

/// Host events the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    ConnectivityChanged(Connectivity),
    ReplayRequested(ReplaySource),
}

/// Why an event did not start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    /// Online was reported while already online
    NoTransition,
}

/// Result of one reconcile + drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Whether remote state was fetched and merged
    pub reconciled: bool,
    pub drain: DrainReport,
    /// Canonical list after the pass, newest-first
    pub entries: Vec<Entry>,
}

impl PassReport {
    pub const fn is_clean(&self) -> bool {
        self.reconciled && self.drain.remaining() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    Coalesced,
    Skipped(SkipReason),
}

/// Holds a flag raised for as long as the guard lives.
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns connectivity changes and replay requests into sync passes.
pub struct SyncCoordinator<G> {
    reconciler: Reconciler<G>,
    queue: SyncQueueProcessor<G>,
    store: LocalStore,
    online: AtomicBool,
    in_flight: AtomicBool,
    loop_running: AtomicBool,
    lease_holder: String,
    state_tx: watch::Sender<SyncState>,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<SyncEvent>>>,
}

impl<G: RemoteGateway> SyncCoordinator<G> {
    pub fn new(store: LocalStore, gateway: Arc<G>, connectivity: Connectivity) -> Self {
        let initial = if connectivity.is_online() {
            SyncState::Synced
        } else {
            SyncState::Offline
        };
        let (state_tx, _) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            reconciler: Reconciler::new(store.clone(), Arc::clone(&gateway)),
            queue: SyncQueueProcessor::new(store.clone(), gateway),
            store,
            online: AtomicBool::new(connectivity.is_online()),
            in_flight: AtomicBool::new(false),
            loop_running: AtomicBool::new(false),
            lease_holder: lease_holder(),
            state_tx,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    pub const fn queue(&self) -> &SyncQueueProcessor<G> {
        &self.queue
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity::from_online(self.online.load(Ordering::Acquire))
    }

    pub fn is_online(&self) -> bool {
        self.connectivity().is_online()
    }

    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    /// Receive every published `SyncState`.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    /// Sender feeding the `run` loop. Events sent here are buffered until the
    /// loop consumes them.
    pub fn events(&self) -> mpsc::UnboundedSender<SyncEvent> {
        self.events_tx.clone()
    }

    /// Ask the `run` loop for a pass.
    ///
    /// Without a running loop the request is dropped; the next pass picks up
    /// whatever is queued.
    pub fn request_replay(&self, source: ReplaySource) {
        if !self.loop_running.load(Ordering::Acquire) {
            tracing::debug!("No sync event loop running; {source} replay deferred to the next pass");
            return;
        }
        if self
            .events_tx
            .send(SyncEvent::ReplayRequested(source))
            .is_err()
        {
            tracing::debug!("Replay request from {source} dropped; event loop stopped");
        }
    }

    /// Run a pass now, as a user-initiated sync.
    pub async fn sync_now(&self) -> Result<PassOutcome> {
        self.handle_event(SyncEvent::ReplayRequested(ReplaySource::Manual))
            .await
    }

    /// Single entry point for host events.
    pub async fn handle_event(&self, event: SyncEvent) -> Result<PassOutcome> {
        match event {
            SyncEvent::ConnectivityChanged(Connectivity::Offline) => {
                if self.online.swap(false, Ordering::AcqRel) {
                    tracing::info!("Connectivity lost; changes will be queued");
                }
                self.publish(SyncState::Offline);
                Ok(PassOutcome::Skipped(SkipReason::Offline))
            }
            SyncEvent::ConnectivityChanged(Connectivity::Online) => {
                if self.online.swap(true, Ordering::AcqRel) {
                    return Ok(PassOutcome::Skipped(SkipReason::NoTransition));
                }
                tracing::info!("Connectivity restored");
                self.run_pass("reconnect").await
            }
            SyncEvent::ReplayRequested(source) => {
                if !self.is_online() {
                    tracing::debug!("Skipping {source} replay while offline");
                    return Ok(PassOutcome::Skipped(SkipReason::Offline));
                }
                self.run_pass(source).await
            }
        }
    }

    /// Consume events until every sender is gone.
    ///
    /// Only one loop may run per coordinator.
    pub async fn run(&self) -> Result<()> {
        let Some(mut events) = self.events_rx.lock().await.take() else {
            return Err(Error::InvalidInput(
                "sync event loop is already running".to_string(),
            ));
        };
        // The receiver is taken once, so this flag has no other claimant.
        let _running = FlagGuard::claim(&self.loop_running);

        while let Some(event) = events.recv().await {
            if let Err(error) = self.handle_event(event).await {
                tracing::error!("Sync pass for {event:?} failed: {error}");
            }
        }
        Ok(())
    }

    async fn run_pass(&self, trigger: impl fmt::Display + Send) -> Result<PassOutcome> {
        let Some(_guard) = FlagGuard::claim(&self.in_flight) else {
            tracing::debug!("Sync pass already running; {trigger} request coalesced");
            return Ok(PassOutcome::Coalesced);
        };
        if !self
            .store
            .claim_sync_lease(&self.lease_holder, PASS_LEASE_TTL)
            .await?
        {
            tracing::debug!("Another process is syncing this store; {trigger} request coalesced");
            return Ok(PassOutcome::Coalesced);
        }

        self.publish(SyncState::Syncing);
        let result = self.pass().await;
        if let Err(error) = self.store.release_sync_lease(&self.lease_holder).await {
            tracing::warn!("Failed to release sync lease: {error}");
        }

        match result {
            Ok(report) => {
                tracing::info!(
                    "Sync pass ({trigger}) finished: {} entries, {} delivered, {} queued",
                    report.entries.len(),
                    report.drain.delivered,
                    report.drain.remaining()
                );
                self.publish_settled(if report.is_clean() {
                    SyncState::Synced
                } else {
                    SyncState::Error
                });
                Ok(PassOutcome::Completed(report))
            }
            Err(error) => {
                self.publish_settled(SyncState::Error);
                Err(error)
            }
        }
    }

    async fn pass(&self) -> Result<PassReport> {
        let reconciled = self.reconciler.reconcile().await?.is_merged();
        let drain = self.queue.drain().await?;
        let entries = self.store.get_all().await?;
        Ok(PassReport {
            reconciled,
            drain,
            entries,
        })
    }

    /// Publish the end state of a pass unless connectivity dropped meanwhile.
    fn publish_settled(&self, state: SyncState) {
        if self.is_online() {
            self.publish(state);
        } else {
            self.publish(SyncState::Offline);
        }
    }

    fn publish(&self, state: SyncState) {
        self.state_tx.send_replace(state);
    }
}
