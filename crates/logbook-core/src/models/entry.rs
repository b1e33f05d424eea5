//! Activity entry model

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Entry identifier.
///
/// Ids handed out by the local store are negative; ids assigned by the remote
/// service are positive.
pub type EntryId = i64;

/// A user-submitted activity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Local or server-assigned identifier
    pub id: Option<EntryId>,
    /// Student name
    pub name: String,
    /// Free-form activity note
    pub activity: String,
    /// Creation timestamp (Unix ms)
    pub timestamp: i64,
}

impl Entry {
    /// Create an entry stamped with the current time and no id yet
    #[must_use]
    pub fn new(name: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            activity: activity.into(),
            timestamp: crate::util::unix_millis_now(),
        }
    }

    #[must_use]
    pub const fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the remote service has assigned this entry's id
    pub const fn has_server_id(&self) -> bool {
        matches!(self.id, Some(id) if is_server_id(id))
    }
}

/// Server ids are strictly positive.
pub const fn is_server_id(id: EntryId) -> bool {
    id > 0
}

/// Order entries newest first.
///
/// Equal timestamps fall back to id (descending, missing ids last) so the
/// result does not depend on input order.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|left, right| {
        right
            .timestamp
            .cmp(&left.timestamp)
            .then_with(|| match (left.id, right.id) {
                (Some(left), Some(right)) => right.cmp(&left),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}
