// Records shared between the workflow engine and its stores

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflow::BugStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BugId(pub i64);

impl fmt::Display for BugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A bug as persisted by the surrounding CRUD layer.
///
/// Creator and assignee are plain user references; stores always populate
/// them before the bug reaches policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: BugId,
    pub status: BugStatus,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bug {
    pub fn created_by(&self) -> Option<&UserId> {
        self.created_by.as_ref()
    }

    pub fn assigned_to(&self) -> Option<&UserId> {
        self.assigned_to.as_ref()
    }

    /// True when `user` created the bug or is its assignee.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.created_by() == Some(user) || self.assigned_to() == Some(user)
    }

    pub fn owners(&self) -> Owners {
        Owners {
            created_by: self.created_by.clone(),
            assigned_to: self.assigned_to.clone(),
        }
    }
}

/// The ownership fields an authorization decision was made against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owners {
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
}

/// Current time at the microsecond precision stores persist, rounded up so it
/// never precedes the instant it was taken.
pub fn commit_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    let truncated = now.trunc_subsecs(6);
    if truncated < now {
        truncated + TimeDelta::microseconds(1)
    } else {
        truncated
    }
}

/// Input for the bug-creation collaborator.
#[derive(Debug, Clone)]
pub struct NewBug {
    pub status: BugStatus,
    pub created_by: Option<UserId>,
    pub assigned_to: Option<UserId>,
}

impl NewBug {
    pub fn open(created_by: impl Into<UserId>) -> Self {
        Self {
            status: BugStatus::Open,
            created_by: Some(created_by.into()),
            assigned_to: None,
        }
    }

    pub fn with_status(mut self, status: BugStatus) -> Self {
        self.status = status;
        self
    }

    pub fn assigned_to(mut self, user: impl Into<UserId>) -> Self {
        self.assigned_to = Some(user.into());
        self
    }
}

/// One entry of the history ledger. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub id: i64,
    pub bug_id: BugId,
    pub from_status: BugStatus,
    pub to_status: BugStatus,
    pub comment: Option<String>,
    pub transitioned_at: DateTime<Utc>,
    /// `None` for system-initiated transitions.
    pub changed_by: Option<UserId>,
}

/// A validated change handed to a store for an atomic commit.
///
/// `from_status` and `expected_owners` are the compare-and-set guard: the
/// store only applies the change while the bug row still holds the status and
/// ownership the policy was evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub bug_id: BugId,
    pub from_status: BugStatus,
    pub expected_owners: Owners,
    pub to_status: BugStatus,
    pub comment: Option<String>,
    pub changed_by: Option<UserId>,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// Change guarded by the state of `bug` as it was read.
    pub fn from_bug(
        bug: &Bug,
        to_status: BugStatus,
        changed_by: Option<UserId>,
        comment: Option<String>,
    ) -> Self {
        Self {
            bug_id: bug.id,
            from_status: bug.status,
            expected_owners: bug.owners(),
            to_status,
            comment,
            changed_by,
            at: commit_timestamp(),
        }
    }
}
