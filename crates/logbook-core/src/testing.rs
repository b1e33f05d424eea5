//! Scripted in-process remote used by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Entry, EntryId};
use crate::remote::RemoteGateway;
use crate::util::{millis_to_secs, secs_to_millis};
use crate::{Error, Result};

#[derive(Default)]
struct FakeState {
    entries: Vec<Entry>,
    next_id: EntryId,
    unreachable: bool,
    rejected_names: HashSet<String>,
    rejected_removals: HashSet<EntryId>,
    create_calls: usize,
    remove_calls: usize,
    create_delay: Duration,
    omit_ids: bool,
}

/// Remote that keeps entries in memory and fails on demand.
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 100,
                ..FakeState::default()
            }),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().unreachable = !reachable;
    }

    /// Put an entry on the server as if another device created it.
    pub fn seed(&self, entry: Entry) {
        self.state.lock().unwrap().entries.push(entry);
    }

    /// Make every create carrying this name fail.
    pub fn reject_name(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_names
            .insert(name.to_string());
    }

    pub fn accept_name(&self, name: &str) {
        self.state.lock().unwrap().rejected_names.remove(name);
    }

    pub fn reject_removal(&self, server_id: EntryId) {
        self.state
            .lock()
            .unwrap()
            .rejected_removals
            .insert(server_id);
    }

    /// Hold every create this long before the server answers.
    pub fn set_create_delay(&self, delay: Duration) {
        self.state.lock().unwrap().create_delay = delay;
    }

    /// Accept creates but answer without the assigned id.
    pub fn omit_ids(&self) {
        self.state.lock().unwrap().omit_ids = true;
    }

    pub fn accept_removal(&self, server_id: EntryId) {
        self.state
            .lock()
            .unwrap()
            .rejected_removals
            .remove(&server_id);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.state.lock().unwrap().remove_calls
    }
}

impl RemoteGateway for FakeGateway {
    async fn create(&self, entry: &Entry) -> Result<Entry> {
        let delay = self.state.lock().unwrap().create_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if state.unreachable {
            return Err(Error::Network("connection refused".to_string()));
        }
        if state.rejected_names.contains(&entry.name) {
            return Err(Error::Network("rejected (500)".to_string()));
        }

        let id = state.next_id;
        state.next_id += 1;
        // The real API stores seconds.
        let created = Entry {
            id: Some(id),
            name: entry.name.clone(),
            activity: entry.activity.clone(),
            timestamp: secs_to_millis(millis_to_secs(entry.timestamp)),
        };
        state.entries.push(created.clone());
        if state.omit_ids {
            return Ok(Entry { id: None, ..created });
        }
        Ok(created)
    }

    async fn remove(&self, server_id: EntryId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.remove_calls += 1;
        if state.unreachable {
            return Err(Error::Network("connection refused".to_string()));
        }
        if state.rejected_removals.contains(&server_id) {
            return Err(Error::Network("rejected (500)".to_string()));
        }
        state.entries.retain(|entry| entry.id != Some(server_id));
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Entry>> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(Error::Network("connection refused".to_string()));
        }
        Ok(state.entries.clone())
    }
}
