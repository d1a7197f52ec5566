use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{CommitOutcome, StoreError, WorkflowStore};
use crate::model::{Bug, BugId, NewBug, StatusChange, StatusTransition, UserId};
use crate::workflow::BugStatus;

const BUG_COLUMNS: &str = "id, status, created_by, assigned_to, created_at, updated_at";
const TRANSITION_COLUMNS: &str =
    "id, bug_id, from_status, to_status, comment, transitioned_at, changed_by";

/// SQLite-backed store for bugs and their transition ledger
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and optionally run migrations
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        // Every connection to an in-memory database sees its own database, so
        // the single connection must never be recycled.
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = options.connect(database_url).await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bug creation hook for the CRUD layer.
    pub async fn create_bug(&self, new_bug: NewBug) -> Result<Bug, StoreError> {
        let now = encode_timestamp(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO bugs (status, created_by, assigned_to, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(new_bug.status.as_str())
        .bind(new_bug.created_by.as_ref().map(UserId::as_str))
        .bind(new_bug.assigned_to.as_ref().map(UserId::as_str))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = BugId(result.last_insert_rowid());
        self.fetch_bug(id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("bug {id} vanished after insert")))
    }

    /// Reassignment hook for the CRUD layer. False when the bug is unknown.
    pub async fn assign_bug(&self, id: BugId, assignee: Option<UserId>) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bugs SET assigned_to = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(assignee.as_ref().map(UserId::as_str))
            .bind(encode_timestamp(Utc::now()))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes a bug; the ledger follows through ON DELETE CASCADE.
    pub async fn delete_bug(&self, id: BugId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bugs WHERE id = ?1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn fetch_bug(&self, id: BugId) -> Result<Option<Bug>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BUG_COLUMNS} FROM bugs WHERE id = ?1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(bug_from_row).transpose()
    }

    async fn commit_transition(&self, change: &StatusChange) -> Result<CommitOutcome, StoreError> {
        let at = encode_timestamp(change.at);
        let mut tx = self.pool.begin().await?;

        // Compare-and-set on the status and owners the caller evaluated.
        let updated = sqlx::query(
            r#"
            UPDATE bugs SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND status = ?4 AND created_by IS ?5 AND assigned_to IS ?6
            "#,
        )
        .bind(change.to_status.as_str())
        .bind(&at)
        .bind(change.bug_id.0)
        .bind(change.from_status.as_str())
        .bind(change.expected_owners.created_by.as_ref().map(UserId::as_str))
        .bind(change.expected_owners.assigned_to.as_ref().map(UserId::as_str))
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let current = sqlx::query("SELECT status FROM bugs WHERE id = ?1")
                .bind(change.bug_id.0)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            debug!(bug_id = %change.bug_id, "Status compare-and-set matched no row");
            return match current {
                None => Ok(CommitOutcome::NotFound),
                Some(row) => Ok(CommitOutcome::Conflict {
                    current: decode_status("bugs", row.try_get("status")?)?,
                }),
            };
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO status_transitions
                (bug_id, from_status, to_status, comment, transitioned_at, changed_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(change.bug_id.0)
        .bind(change.from_status.as_str())
        .bind(change.to_status.as_str())
        .bind(change.comment.as_deref())
        .bind(&at)
        .bind(change.changed_by.as_ref().map(UserId::as_str))
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {BUG_COLUMNS} FROM bugs WHERE id = ?1"))
            .bind(change.bug_id.0)
            .fetch_one(&mut *tx)
            .await?;
        let bug = bug_from_row(&row)?;

        tx.commit().await?;

        let record = StatusTransition {
            id: inserted.last_insert_rowid(),
            bug_id: change.bug_id,
            from_status: change.from_status,
            to_status: change.to_status,
            comment: change.comment.clone(),
            transitioned_at: change.at,
            changed_by: change.changed_by.clone(),
        };
        Ok(CommitOutcome::Applied { bug, record })
    }

    async fn history(&self, id: BugId) -> Result<Vec<StatusTransition>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM status_transitions \
             WHERE bug_id = ?1 ORDER BY transitioned_at ASC, id ASC"
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transition_from_row).collect()
    }

    async fn status_counts(&self) -> Result<Vec<(BugStatus, u64)>, StoreError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM bugs GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let status = decode_status("bugs", row.try_get("status")?)?;
            let n: i64 = row.try_get("n")?;
            counts.insert(status, n as u64);
        }
        Ok(counts.into_iter().collect())
    }

    async fn transition_counts(&self) -> Result<Vec<(BugStatus, BugStatus, u64)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT from_status, to_status, COUNT(*) AS n
            FROM status_transitions
            GROUP BY from_status, to_status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let from = decode_status("status_transitions", row.try_get("from_status")?)?;
            let to = decode_status("status_transitions", row.try_get("to_status")?)?;
            let n: i64 = row.try_get("n")?;
            counts.insert((from, to), n as u64);
        }
        Ok(counts.into_iter().map(|((from, to), n)| (from, to, n)).collect())
    }
}

// Fixed-width UTC text so lexical order matches chronological order.
fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord {
            table,
            reason: format!("bad timestamp {raw:?}: {e}"),
        })
}

fn decode_status(table: &'static str, raw: String) -> Result<BugStatus, StoreError> {
    raw.parse().map_err(|e| StoreError::CorruptRecord {
        table,
        reason: format!("{e}"),
    })
}

fn bug_from_row(row: &SqliteRow) -> Result<Bug, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Bug {
        id: BugId(row.try_get("id")?),
        status: decode_status("bugs", row.try_get("status")?)?,
        created_by: row.try_get::<Option<String>, _>("created_by")?.map(UserId::new),
        assigned_to: row.try_get::<Option<String>, _>("assigned_to")?.map(UserId::new),
        created_at: decode_timestamp("bugs", &created_at)?,
        updated_at: decode_timestamp("bugs", &updated_at)?,
    })
}

fn transition_from_row(row: &SqliteRow) -> Result<StatusTransition, StoreError> {
    let transitioned_at: String = row.try_get("transitioned_at")?;
    Ok(StatusTransition {
        id: row.try_get("id")?,
        bug_id: BugId(row.try_get("bug_id")?),
        from_status: decode_status("status_transitions", row.try_get("from_status")?)?,
        to_status: decode_status("status_transitions", row.try_get("to_status")?)?,
        comment: row.try_get("comment")?,
        transitioned_at: decode_timestamp("status_transitions", &transitioned_at)?,
        changed_by: row.try_get::<Option<String>, _>("changed_by")?.map(UserId::new),
    })
}
