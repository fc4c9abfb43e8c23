//! Session checkpoint stores.
//!
//! A checkpoint store owns every [`Session`] between turns. Two backends are
//! provided:
//!
//! - [`MemoryCheckpointStore`]: process-lifetime, [`DashMap`]-backed.
//! - [`SqliteCheckpointStore`]: durable, one JSON record per session row.
//!
//! Neither backend serializes turns on its own; callers pair a store with
//! [`SessionLocks`](crate::SessionLocks) so that load → advance → save runs
//! under per-session mutual exclusion.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::session::Session;

/// Contract shared by all checkpoint backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Reserve a new session token backed by an empty session record.
    async fn create(&self) -> StoreResult<String>;

    /// Load the session stored under `token`.
    ///
    /// Returns [`StoreError::NotFound`] for unknown tokens.
    async fn load(&self, token: &str) -> StoreResult<Session>;

    /// Replace the session stored under `token`.
    async fn save(&self, token: &str, session: &Session) -> StoreResult<()>;

    /// Number of stored sessions.
    async fn count(&self) -> StoreResult<usize>;
}

fn new_token() -> String {
    Uuid::now_v7().to_string()
}

// ═══════════════════════════════════════════════════════════════════════
//  In-memory backend
// ═══════════════════════════════════════════════════════════════════════

/// Process-lifetime checkpoint store.
///
/// Cheaply cloneable; clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn create(&self) -> StoreResult<String> {
        let token = new_token();
        self.sessions.insert(token.clone(), Session::default());
        debug!(session = %token, "session created (memory)");
        Ok(token)
    }

    async fn load(&self, token: &str) -> StoreResult<Session> {
        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "session",
                id: token.to_owned(),
            })
    }

    async fn save(&self, token: &str, session: &Session) -> StoreResult<()> {
        self.sessions.insert(token.to_owned(), session.clone());
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.sessions.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  SQLite backend
// ═══════════════════════════════════════════════════════════════════════

/// Durable checkpoint store on top of [`Database`].
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    db: Database,
}

impl SqliteCheckpointStore {
    /// Create a store backed by `db`. The schema must already be migrated.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Delete sessions whose last update is older than `max_age_secs`.
    ///
    /// The core enforces no TTL; this exists for deployments that want one.
    #[instrument(skip(self))]
    pub async fn prune_older_than(&self, max_age_secs: i64) -> StoreResult<usize> {
        let cutoff = Utc::now().timestamp() - max_age_secs;
        self.db
            .execute(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM sessions WHERE updated_at < ?1",
                    rusqlite::params![cutoff],
                )?;
                Ok(removed)
            })
            .await
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    #[instrument(skip(self))]
    async fn create(&self) -> StoreResult<String> {
        let token = new_token();
        let session = Session::default();
        let record = serde_json::to_string(&session)?;
        let pipeline = session.pipeline.as_str();
        let now = session.created_at.timestamp();

        let id = token.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (token, pipeline, record, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    rusqlite::params![id, pipeline, record, now],
                )?;
                Ok(())
            })
            .await?;

        debug!(session = %token, "session created (sqlite)");
        Ok(token)
    }

    #[instrument(skip(self))]
    async fn load(&self, token: &str) -> StoreResult<Session> {
        let id = token.to_owned();
        let record: String = self
            .db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT record FROM sessions WHERE token = ?1",
                    rusqlite::params![id],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                        entity: "session",
                        id: id.clone(),
                    },
                    other => StoreError::Sqlite(other),
                })
            })
            .await?;

        Ok(serde_json::from_str(&record)?)
    }

    #[instrument(skip(self, session))]
    async fn save(&self, token: &str, session: &Session) -> StoreResult<()> {
        let id = token.to_owned();
        let record = serde_json::to_string(session)?;
        let pipeline = session.pipeline.as_str();
        let delivered = session.is_delivered();
        let created_at = session.created_at.timestamp();
        let updated_at = session.updated_at.timestamp();

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (token, pipeline, record, delivered, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(token) DO UPDATE SET \
                        pipeline = excluded.pipeline, \
                        record = excluded.record, \
                        delivered = excluded.delivered, \
                        updated_at = excluded.updated_at",
                    rusqlite::params![id, pipeline, record, delivered, created_at, updated_at],
                )?;
                Ok(())
            })
            .await
    }

    async fn count(&self) -> StoreResult<usize> {
        self.db
            .execute(|conn| {
                let n: i64 = conn.query_row("SELECT count(*) FROM sessions", [], |row| row.get(0))?;
                Ok(n as usize)
            })
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
