//! Pending mutation queue repository

use crate::error::{Error, Result};
use crate::models::{EntryId, MutationId, PendingMutation, PendingOperation};
use crate::util::unix_millis_now;
use libsql::{params, Connection};

/// Trait for pending-mutation queue operations (async)
#[allow(async_fn_in_trait)]
pub trait MutationRepository {
    /// Append a mutation to the end of the queue
    async fn enqueue(&self, operation: &PendingOperation) -> Result<PendingMutation>;

    /// All queued mutations, oldest first
    async fn list(&self) -> Result<Vec<PendingMutation>>;

    /// Drop an acknowledged mutation; returns whether it was queued
    async fn remove(&self, id: MutationId) -> Result<bool>;

    /// Drop the queued create for a local entry; returns whether one existed
    async fn cancel_create(&self, entry_id: EntryId) -> Result<bool>;

    /// Server ids with a queued delete
    async fn delete_targets(&self) -> Result<Vec<EntryId>>;
}

/// libSQL implementation of `MutationRepository`
pub struct LibSqlMutationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlMutationRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_mutation(row: &libsql::Row) -> Result<PendingMutation> {
        let id = row.get::<i64>(0)?;
        let kind = row.get::<String>(1)?;

        let operation = match kind.as_str() {
            "create" => PendingOperation::Create {
                entry_id: row.get::<Option<i64>>(2)?,
                name: required(row.get::<Option<String>>(3)?, id, "name")?,
                activity: required(row.get::<Option<String>>(4)?, id, "activity")?,
                timestamp: required(row.get::<Option<i64>>(5)?, id, "timestamp")?,
            },
            "delete" => PendingOperation::Delete {
                server_id: required(row.get::<Option<i64>>(6)?, id, "server_id")?,
            },
            other => {
                return Err(Error::Storage(format!(
                    "pending mutation {id} has unknown kind '{other}'"
                )))
            }
        };

        Ok(PendingMutation {
            id,
            operation,
            queued_at: row.get::<i64>(7)?,
        })
    }
}

fn required<T>(value: Option<T>, id: MutationId, column: &str) -> Result<T> {
    value.ok_or_else(|| Error::Storage(format!("pending mutation {id} is missing {column}")))
}

impl MutationRepository for LibSqlMutationRepository<'_> {
    async fn enqueue(&self, operation: &PendingOperation) -> Result<PendingMutation> {
        let queued_at = unix_millis_now();

        match operation {
            PendingOperation::Create {
                entry_id,
                name,
                activity,
                timestamp,
            } => {
                self.conn
                    .execute(
                        "INSERT INTO pending_mutations (kind, entry_id, name, activity, timestamp, queued_at)
                         VALUES ('create', ?, ?, ?, ?, ?)",
                        params![*entry_id, name.as_str(), activity.as_str(), *timestamp, queued_at],
                    )
                    .await?;
            }
            PendingOperation::Delete { server_id } => {
                self.conn
                    .execute(
                        "INSERT INTO pending_mutations (kind, server_id, queued_at) VALUES ('delete', ?, ?)",
                        params![*server_id, queued_at],
                    )
                    .await?;
            }
        }

        Ok(PendingMutation {
            id: self.conn.last_insert_rowid(),
            operation: operation.clone(),
            queued_at,
        })
    }

    async fn list(&self) -> Result<Vec<PendingMutation>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, entry_id, name, activity, timestamp, server_id, queued_at
                 FROM pending_mutations
                 ORDER BY id ASC",
                (),
            )
            .await?;

        let mut mutations = Vec::new();
        while let Some(row) = rows.next().await? {
            mutations.push(Self::parse_mutation(&row)?);
        }
        Ok(mutations)
    }

    async fn remove(&self, id: MutationId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pending_mutations WHERE id = ?", params![id])
            .await?;
        Ok(rows > 0)
    }

    async fn cancel_create(&self, entry_id: EntryId) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM pending_mutations WHERE kind = 'create' AND entry_id = ?",
                params![entry_id],
            )
            .await?;
        Ok(rows > 0)
    }

    async fn delete_targets(&self) -> Result<Vec<EntryId>> {
        let mut rows = self
            .conn
            .query(
                "SELECT server_id FROM pending_mutations
                 WHERE kind = 'delete' AND server_id IS NOT NULL
                 ORDER BY id ASC",
                (),
            )
            .await?;

        let mut targets = Vec::new();
        while let Some(row) = rows.next().await? {
            targets.push(row.get::<i64>(0)?);
        }
        Ok(targets)
    }
}
