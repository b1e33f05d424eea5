use std::sync::Arc;
use std::time::Duration;

use logbook_core::sync::{ReplaySource, SyncEvent};
use logbook_core::SyncState;

use crate::commands::common::open_session;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_watch(interval_secs: u64, settings: &Settings) -> Result<(), CliError> {
    if interval_secs == 0 {
        return Err(CliError::InvalidInterval);
    }
    settings.require_remote()?;

    let (service, remote) = open_session(settings).await?;
    let coordinator = Arc::clone(service.coordinator());
    let events = coordinator.events();
    let mut states = coordinator.subscribe();

    let runner = Arc::clone(&coordinator);
    let event_loop = tokio::spawn(async move { runner.run().await });

    // Buffered until the spawned loop picks it up.
    if events
        .send(SyncEvent::ReplayRequested(ReplaySource::Startup))
        .is_err()
    {
        tracing::warn!("Sync event loop stopped before startup replay");
    }
    println!("Watching every {interval_secs}s, press Ctrl-C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately; startup already asked for a pass.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let was_online = coordinator.is_online();
                let connectivity = remote.connectivity(settings.offline).await;
                if events.send(SyncEvent::ConnectivityChanged(connectivity)).is_err() {
                    break;
                }
                if was_online && connectivity.is_online() {
                    coordinator.request_replay(ReplaySource::Timer);
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                println!("{}", describe_state(state));
            }
        }
    }

    event_loop.abort();
    let queued = service.store().pending().await?.len();
    println!("Stopped; {queued} change(s) still queued");
    Ok(())
}

pub const fn describe_state(state: SyncState) -> &'static str {
    match state {
        SyncState::Offline => "offline: changes are queued",
        SyncState::Syncing => "syncing...",
        SyncState::Synced => "synced",
        SyncState::Error => "sync incomplete: will retry",
    }
}
