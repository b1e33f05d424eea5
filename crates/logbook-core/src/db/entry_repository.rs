//! Entry repository implementation

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId};
use crate::util::unix_millis_now;
use libsql::{params, Connection};

/// Trait for committed-entry storage operations (async)
#[allow(async_fn_in_trait)]
pub trait EntryRepository {
    /// Insert a new entry stamped with the current time under a fresh local id
    async fn add(&self, name: &str, activity: &str) -> Result<Entry>;

    /// Insert an entry keeping its id; entries without one get a local id
    async fn insert(&self, entry: &Entry) -> Result<EntryId>;

    /// Get an entry by id
    async fn get(&self, id: EntryId) -> Result<Entry>;

    /// List all entries, newest first
    async fn list(&self) -> Result<Vec<Entry>>;

    /// Delete an entry; returns whether a row was removed
    async fn delete(&self, id: EntryId) -> Result<bool>;

    /// Remove every committed entry
    async fn clear(&self) -> Result<()>;

    /// Discard all entries and insert the given ones, skipping rows that fail
    async fn replace_all(&self, entries: &[Entry]) -> Result<usize>;

    /// Move an entry from its local id to the id the server assigned
    async fn rekey(&self, local_id: EntryId, server_id: EntryId) -> Result<()>;
}

/// libSQL implementation of `EntryRepository`
pub struct LibSqlEntryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Issue the next local id from the sequence table
    async fn next_local_id(&self) -> Result<EntryId> {
        self.conn
            .execute(
                "INSERT INTO local_id_sequence (issued_at) VALUES (?)",
                params![unix_millis_now()],
            )
            .await?;
        Ok(-self.conn.last_insert_rowid())
    }

    fn parse_entry(row: &libsql::Row) -> Result<Entry> {
        Ok(Entry {
            id: Some(row.get::<i64>(0)?),
            name: row.get::<String>(1)?,
            activity: row.get::<String>(2)?,
            timestamp: row.get::<i64>(3)?,
        })
    }
}

impl EntryRepository for LibSqlEntryRepository<'_> {
    async fn add(&self, name: &str, activity: &str) -> Result<Entry> {
        let entry = Entry::new(name, activity);
        let id = self.insert(&entry).await?;
        tracing::debug!("Entry added with local id {id}");
        Ok(entry.with_id(id))
    }

    async fn insert(&self, entry: &Entry) -> Result<EntryId> {
        let id = match entry.id {
            Some(id) => id,
            None => self.next_local_id().await?,
        };

        self.conn
            .execute(
                "INSERT INTO entries (id, name, activity, timestamp) VALUES (?, ?, ?, ?)",
                params![id, entry.name.as_str(), entry.activity.as_str(), entry.timestamp],
            )
            .await?;

        Ok(id)
    }

    async fn get(&self, id: EntryId) -> Result<Entry> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, activity, timestamp FROM entries WHERE id = ?",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_entry(&row),
            None => Err(Error::NotFound(id)),
        }
    }

    async fn list(&self) -> Result<Vec<Entry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, activity, timestamp
                 FROM entries
                 ORDER BY timestamp DESC, id DESC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    async fn delete(&self, id: EntryId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", params![id])
            .await?;
        Ok(rows > 0)
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM entries", ()).await?;
        Ok(())
    }

    async fn replace_all(&self, entries: &[Entry]) -> Result<usize> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        if let Err(e) = self.clear().await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }

        let mut inserted = 0;
        for entry in entries {
            match self.insert(entry).await {
                Ok(_) => inserted += 1,
                Err(error) => {
                    tracing::warn!("Skipping entry {:?} during replace: {}", entry.id, error);
                }
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(inserted)
    }

    async fn rekey(&self, local_id: EntryId, server_id: EntryId) -> Result<()> {
        if local_id == server_id {
            return Ok(());
        }

        let server_row_exists = {
            let mut rows = self
                .conn
                .query("SELECT 1 FROM entries WHERE id = ?", params![server_id])
                .await?;
            rows.next().await?.is_some()
        };

        // The remote copy already fetched under the server id wins over ours.
        let rows = if server_row_exists {
            self.conn
                .execute("DELETE FROM entries WHERE id = ?", params![local_id])
                .await?
        } else {
            self.conn
                .execute(
                    "UPDATE entries SET id = ? WHERE id = ?",
                    params![server_id, local_id],
                )
                .await?
        };

        if rows == 0 {
            return Err(Error::NotFound(local_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn entry(id: EntryId, name: &str, timestamp: i64) -> Entry {
        Entry {
            id: Some(id),
            name: name.to_string(),
            activity: format!("{name}'s activity"),
            timestamp,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_assigns_negative_unique_ids() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let first = repo.add("Ana", "reading").await.unwrap();
        let second = repo.add("Ben", "football").await.unwrap();

        assert!(first.id.unwrap() < 0);
        assert!(second.id.unwrap() < 0);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_local_ids_are_not_reused_after_delete() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let first = repo.add("Ana", "reading").await.unwrap();
        repo.delete(first.id.unwrap()).await.unwrap();
        let second = repo.add("Ana", "reading").await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_is_newest_first() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        repo.insert(&entry(1, "Ana", 100)).await.unwrap();
        repo.insert(&entry(2, "Ben", 300)).await.unwrap();
        repo.insert(&entry(3, "Cy", 200)).await.unwrap();

        let names: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["Ben", "Cy", "Ana"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let error = repo.get(99).await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        repo.insert(&entry(4, "Ana", 1)).await.unwrap();
        assert!(repo.delete(4).await.unwrap());
        assert!(!repo.delete(4).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_all_preserves_ids_and_skips_failures() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        repo.insert(&entry(1, "Old", 1)).await.unwrap();

        // The duplicate id fails on insert and must not abort the rest.
        let replacement = vec![entry(10, "Ana", 30), entry(10, "Dup", 20), entry(-7, "Ben", 10)];
        let inserted = repo.replace_all(&replacement).await.unwrap();
        assert_eq!(inserted, 2);

        let stored = repo.list().await.unwrap();
        assert_eq!(stored, vec![entry(10, "Ana", 30), entry(-7, "Ben", 10)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rekey_moves_entry_to_server_id() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        let local = repo.add("Ana", "reading").await.unwrap();
        repo.rekey(local.id.unwrap(), 42).await.unwrap();

        let moved = repo.get(42).await.unwrap();
        assert_eq!(moved.name, "Ana");
        assert_eq!(moved.timestamp, local.timestamp);
        assert!(repo.get(local.id.unwrap()).await.unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rekey_onto_existing_server_row_keeps_one_copy() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        repo.insert(&entry(-1, "Ana", 5_250)).await.unwrap();
        repo.insert(&Entry {
            activity: "edited remotely".to_string(),
            ..entry(42, "Ana", 5_000)
        })
        .await
        .unwrap();
        repo.rekey(-1, 42).await.unwrap();

        let stored = repo.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, Some(42));
        assert_eq!(stored[0].activity, "edited remotely");
        assert_eq!(stored[0].timestamp, 5_000);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rekey_missing_local_row_is_not_found_even_if_server_row_exists() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        repo.insert(&entry(42, "Ana", 5_000)).await.unwrap();
        assert!(repo.rekey(-1, 42).await.unwrap_err().is_not_found());
        assert_eq!(repo.get(42).await.unwrap().name, "Ana");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rekey_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlEntryRepository::new(db.connection());

        assert!(repo.rekey(-5, 42).await.unwrap_err().is_not_found());
    }
}
