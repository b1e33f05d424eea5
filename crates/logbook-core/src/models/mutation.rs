//! Pending mutation model

use serde::{Deserialize, Serialize};

use super::{Entry, EntryId};

/// Queue-local identifier of a pending mutation
pub type MutationId = i64;

/// A change that has not been acknowledged by the remote service yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Queue position (insertion order)
    pub id: MutationId,
    /// The change itself
    pub operation: PendingOperation,
    /// When the change was queued (Unix ms)
    pub queued_at: i64,
}

/// Payload of a pending mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingOperation {
    /// Push a locally created entry
    Create {
        /// Local id of the entry to re-key after delivery
        entry_id: Option<EntryId>,
        name: String,
        activity: String,
        timestamp: i64,
    },
    /// Remove an entry the server already knows
    Delete { server_id: EntryId },
}

impl PendingOperation {
    /// Build a create mutation carrying the full entry payload
    pub fn create(entry: &Entry) -> Self {
        Self::Create {
            entry_id: entry.id,
            name: entry.name.clone(),
            activity: entry.activity.clone(),
            timestamp: entry.timestamp,
        }
    }

    pub const fn delete(server_id: EntryId) -> Self {
        Self::Delete { server_id }
    }

    /// Stored discriminator
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
        }
    }

    /// Entry payload of a create mutation
    pub fn entry(&self) -> Option<Entry> {
        match self {
            Self::Create {
                entry_id,
                name,
                activity,
                timestamp,
            } => Some(Entry {
                id: *entry_id,
                name: name.clone(),
                activity: activity.clone(),
                timestamp: *timestamp,
            }),
            Self::Delete { .. } => None,
        }
    }
}
