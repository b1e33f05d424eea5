//! Remote entries API gateway.
//!
//! Translates between the local entry shape and the remote one: `activity` is
//! sent as `note` and timestamps cross the boundary as Unix seconds. There is
//! no retry here; every failure surfaces as a network error and the sync
//! queue decides what to do with it.

use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::models::{Entry, EntryId};
use crate::util::{compact_text, millis_to_secs, secs_to_millis};
use crate::{Error, Result};

/// Operations the sync engine needs from the system of record.
pub trait RemoteGateway: Send + Sync {
    /// Create an entry remotely; returns it with the server-assigned id
    fn create(&self, entry: &Entry) -> impl Future<Output = Result<Entry>> + Send;

    /// Delete an entry by server id
    fn remove(&self, server_id: EntryId) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the full remote collection
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Entry>>> + Send;
}

/// Entry as the remote API stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub id: EntryId,
    pub name: String,
    pub note: String,
    /// Unix seconds
    pub created_at: i64,
}

/// Request body for creating a remote entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntryDraft {
    pub name: String,
    pub note: String,
    /// Unix seconds
    pub created_at: i64,
}

impl From<&Entry> for RemoteEntryDraft {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            note: entry.activity.clone(),
            created_at: millis_to_secs(entry.timestamp),
        }
    }
}

impl From<RemoteEntry> for Entry {
    fn from(remote: RemoteEntry) -> Self {
        Self {
            id: Some(remote.id),
            name: remote.name,
            activity: remote.note,
            timestamp: secs_to_millis(remote.created_at),
        }
    }
}

/// HTTP implementation of `RemoteGateway`
#[derive(Clone)]
pub struct HttpRemoteGateway {
    entries_url: String,
    client: reqwest::Client,
}

impl HttpRemoteGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            entries_url: format!("{}/entries", config.base_url()),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Whether the API host answers at all, whatever the status.
    pub async fn probe(&self) -> bool {
        self.client.head(&self.entries_url).send().await.is_ok()
    }

    fn entry_url(&self, server_id: EntryId) -> String {
        format!("{}/{server_id}", self.entries_url)
    }
}

impl RemoteGateway for HttpRemoteGateway {
    async fn create(&self, entry: &Entry) -> Result<Entry> {
        let response = self
            .client
            .post(&self.entries_url)
            .header("Accept", "application/json")
            .json(&RemoteEntryDraft::from(entry))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let created = response.json::<RemoteEntry>().await?;
        Ok(created.into())
    }

    async fn remove(&self, server_id: EntryId) -> Result<()> {
        let response = self.client.delete(self.entry_url(server_id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        let response = self
            .client
            .get(&self.entries_url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let remote = response.json::<Vec<RemoteEntry>>().await?;
        Ok(remote.into_iter().map(Entry::from).collect())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Network(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
