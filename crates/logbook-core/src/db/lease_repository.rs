//! Sync lease repository

use crate::error::Result;
use libsql::{params, Connection};

/// Trait for the single-row lease that serializes sync passes (async)
#[allow(async_fn_in_trait)]
pub trait SyncLeaseRepository {
    /// Take the lease for `holder` until `now + ttl_ms` unless someone else
    /// holds an unexpired one; returns whether it was taken
    async fn try_claim(&self, holder: &str, now: i64, ttl_ms: i64) -> Result<bool>;

    /// Give the lease back; returns whether `holder` had it
    async fn release(&self, holder: &str) -> Result<bool>;
}

/// libSQL implementation of `SyncLeaseRepository`
pub struct LibSqlSyncLeaseRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncLeaseRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn claim_locked(&self, holder: &str, now: i64, ttl_ms: i64) -> Result<bool> {
        let current = {
            let mut rows = self
                .conn
                .query("SELECT holder, expires_at FROM sync_lease WHERE id = 1", ())
                .await?;
            match rows.next().await? {
                Some(row) => Some((row.get::<String>(0)?, row.get::<i64>(1)?)),
                None => None,
            }
        };

        if let Some((current_holder, expires_at)) = current {
            if current_holder != holder && expires_at > now {
                return Ok(false);
            }
        }

        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_lease (id, holder, expires_at) VALUES (1, ?, ?)",
                params![holder, now.saturating_add(ttl_ms)],
            )
            .await?;
        Ok(true)
    }
}

impl SyncLeaseRepository for LibSqlSyncLeaseRepository<'_> {
    async fn try_claim(&self, holder: &str, now: i64, ttl_ms: i64) -> Result<bool> {
        // IMMEDIATE takes the write lock up front so two connections cannot
        // both read the lease as free.
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;

        let claimed = match self.claim_locked(holder, now, ttl_ms).await {
            Ok(claimed) => claimed,
            Err(e) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        };

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(claimed)
    }

    async fn release(&self, holder: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM sync_lease WHERE id = 1 AND holder = ?",
                params![holder],
            )
            .await?;
        Ok(rows > 0)
    }
}
