//! # tandem-store
//!
//! Session model and checkpoint storage for tandem.
//!
//! A [`Session`] is persisted between turns by a [`CheckpointStore`]:
//! either the process-lifetime [`MemoryCheckpointStore`] or the durable
//! [`SqliteCheckpointStore`]. [`SessionLocks`] provides the per-session
//! mutual exclusion that turns rely on.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  SessionLocks (DashMap<token, Mutex>)      │
//! ├────────────────────────────────────────────┤
//! │  CheckpointStore                           │
//! │   ├─ MemoryCheckpointStore (DashMap)       │
//! │   └─ SqliteCheckpointStore (JSON records)  │
//! ├────────────────────────────────────────────┤
//! │  Database (rusqlite WAL) + migrations      │
//! └────────────────────────────────────────────┘
//! ```

pub mod checkpoint;
pub mod db;
pub mod error;
pub mod lock;
pub mod migration;
pub mod session;

// ── re-exports ───────────────────────────────────────────────────────

pub use checkpoint::{CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use lock::{SessionGuard, SessionLocks};
pub use session::{AnswerBatch, FormField, MergeReport, Pipeline, Question, Session, UiHint};
