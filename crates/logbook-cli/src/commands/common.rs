use std::sync::Arc;

use chrono::Utc;
use logbook_core::models::{Entry, EntryId, PendingMutation, PendingOperation};
use logbook_core::remote::{HttpRemoteGateway, RemoteGateway};
use logbook_core::services::open_shared;
use logbook_core::{Connectivity, EntryService};
use serde::Serialize;

use crate::config::Settings;
use crate::error::CliError;

/// Remote used by the CLI; unconfigured installs run offline.
pub enum CliRemote {
    Http(HttpRemoteGateway),
    Unconfigured,
}

impl CliRemote {
    fn from_settings(settings: &Settings) -> Result<Self, CliError> {
        match settings.remote.as_ref() {
            Some(config) => Ok(Self::Http(HttpRemoteGateway::new(config)?)),
            None => Ok(Self::Unconfigured),
        }
    }

    /// Probe reachability unless the user asked to stay offline.
    pub async fn connectivity(&self, offline: bool) -> Connectivity {
        match self {
            Self::Http(gateway) if !offline => Connectivity::from_online(gateway.probe().await),
            Self::Http(_) | Self::Unconfigured => Connectivity::Offline,
        }
    }
}

fn unconfigured() -> logbook_core::Error {
    logbook_core::Error::Config("remote API is not configured".to_string())
}

impl RemoteGateway for CliRemote {
    async fn create(&self, entry: &Entry) -> logbook_core::Result<Entry> {
        match self {
            Self::Http(gateway) => gateway.create(entry).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn remove(&self, server_id: EntryId) -> logbook_core::Result<()> {
        match self {
            Self::Http(gateway) => gateway.remove(server_id).await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }

    async fn fetch_all(&self) -> logbook_core::Result<Vec<Entry>> {
        match self {
            Self::Http(gateway) => gateway.fetch_all().await,
            Self::Unconfigured => Err(unconfigured()),
        }
    }
}

/// Open the shared store and wire it to the configured remote.
pub async fn open_service(settings: &Settings) -> Result<EntryService<CliRemote>, CliError> {
    let (service, _remote) = open_session(settings).await?;
    Ok(service)
}

/// Like `open_service`, also handing back the remote for later probes.
pub async fn open_session(
    settings: &Settings,
) -> Result<(EntryService<CliRemote>, Arc<CliRemote>), CliError> {
    let store = open_shared(settings.db_path.clone()).await?;
    let remote = Arc::new(CliRemote::from_settings(settings)?);
    let connectivity = remote.connectivity(settings.offline).await;
    if settings.remote.is_some() && !connectivity.is_online() {
        tracing::info!("Remote API unreachable; working offline");
    }
    let service = EntryService::new(store, Arc::clone(&remote), connectivity);
    Ok((service, remote))
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: Option<EntryId>,
    pub name: String,
    pub activity: String,
    pub timestamp: i64,
    pub relative_time: String,
    pub synced: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub id: i64,
    pub kind: &'static str,
    pub target: Option<EntryId>,
    pub summary: String,
    pub queued_at: i64,
}

pub fn entry_to_list_item(entry: &Entry) -> EntryListItem {
    let now_ms = Utc::now().timestamp_millis();
    EntryListItem {
        id: entry.id,
        name: entry.name.clone(),
        activity: entry.activity.clone(),
        timestamp: entry.timestamp,
        relative_time: format_relative_time(entry.timestamp, now_ms),
        synced: entry.has_server_id(),
    }
}

pub fn format_entry_lines(entries: &[Entry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            let id = entry.id.map_or_else(|| "-".to_string(), |id| id.to_string());
            let marker = if entry.has_server_id() { ' ' } else { '*' };
            let name = preview(&entry.name, 16);
            let activity = preview(&entry.activity, 40);
            let relative_time = format_relative_time(entry.timestamp, now_ms);
            format!("{id:>6}{marker} {name:<16}  {activity:<40}  {relative_time}")
        })
        .collect()
}

pub fn pending_to_item(mutation: &PendingMutation) -> PendingItem {
    let (target, summary) = match &mutation.operation {
        PendingOperation::Create {
            entry_id,
            name,
            activity,
            ..
        } => (*entry_id, format!("{name}: {}", preview(activity, 40))),
        PendingOperation::Delete { server_id } => (Some(*server_id), format!("entry {server_id}")),
    };

    PendingItem {
        id: mutation.id,
        kind: mutation.operation.kind(),
        target,
        summary,
        queued_at: mutation.queued_at,
    }
}

pub fn format_pending_lines(pending: &[PendingMutation]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    pending
        .iter()
        .map(|mutation| {
            let item = pending_to_item(mutation);
            let queued = format_relative_time(item.queued_at, now_ms);
            format!("#{:<5} {:<6}  {:<48}  {queued}", item.id, item.kind, item.summary)
        })
        .collect()
}

/// Collapse whitespace and truncate to `max_chars` with an ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
