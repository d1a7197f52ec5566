// Persistence seam for the workflow engine
// The engine never touches storage directly; everything goes through WorkflowStore.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Bug, BugId, StatusChange, StatusTransition};
use crate::workflow::BugStatus;

pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;

pub use memory::InMemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record in {table}: {reason}")]
    CorruptRecord { table: &'static str, reason: String },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result of an atomic status commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// History appended and bug row updated together.
    Applied { bug: Bug, record: StatusTransition },
    /// The bug no longer holds the expected status or owners; nothing was written.
    Conflict { current: BugStatus },
    NotFound,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Load a bug with its creator and assignee populated.
    async fn fetch_bug(&self, id: BugId) -> Result<Option<Bug>, StoreError>;

    /// Append the history entry and move the bug to `change.to_status` as one
    /// unit, provided the bug still holds `change.from_status` and
    /// `change.expected_owners`.
    async fn commit_transition(&self, change: &StatusChange) -> Result<CommitOutcome, StoreError>;

    /// Ledger entries for a bug, oldest first.
    async fn history(&self, id: BugId) -> Result<Vec<StatusTransition>, StoreError>;

    async fn status_counts(&self) -> Result<Vec<(BugStatus, u64)>, StoreError>;

    async fn transition_counts(&self) -> Result<Vec<(BugStatus, BugStatus, u64)>, StoreError>;
}
