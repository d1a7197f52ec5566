// In-process store: bugs and ledger behind one lock so commits are atomic

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{CommitOutcome, StoreError, WorkflowStore};
use crate::model::{Bug, BugId, NewBug, StatusChange, StatusTransition, UserId};
use crate::workflow::BugStatus;

#[derive(Debug, Default)]
struct MemoryState {
    bugs: HashMap<BugId, Bug>,
    transitions: Vec<StatusTransition>,
    next_bug_id: i64,
    next_transition_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bug creation hook for the CRUD layer.
    pub async fn create_bug(&self, new_bug: NewBug) -> Bug {
        let mut state = self.state.write().await;
        state.next_bug_id += 1;
        let now = Utc::now();
        let bug = Bug {
            id: BugId(state.next_bug_id),
            status: new_bug.status,
            created_by: new_bug.created_by,
            assigned_to: new_bug.assigned_to,
            created_at: now,
            updated_at: now,
        };
        state.bugs.insert(bug.id, bug.clone());
        bug
    }

    /// Reassignment hook for the CRUD layer. False when the bug is unknown.
    pub async fn assign_bug(&self, id: BugId, assignee: Option<UserId>) -> bool {
        let mut state = self.state.write().await;
        let Some(bug) = state.bugs.get_mut(&id) else {
            return false;
        };
        bug.assigned_to = assignee;
        bug.updated_at = Utc::now();
        true
    }

    /// Removes a bug and, by cascade, its ledger.
    pub async fn delete_bug(&self, id: BugId) -> bool {
        let mut state = self.state.write().await;
        state.transitions.retain(|t| t.bug_id != id);
        state.bugs.remove(&id).is_some()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn fetch_bug(&self, id: BugId) -> Result<Option<Bug>, StoreError> {
        Ok(self.state.read().await.bugs.get(&id).cloned())
    }

    async fn commit_transition(&self, change: &StatusChange) -> Result<CommitOutcome, StoreError> {
        let mut state = self.state.write().await;

        let Some(bug) = state.bugs.get_mut(&change.bug_id) else {
            return Ok(CommitOutcome::NotFound);
        };
        if bug.status != change.from_status || bug.owners() != change.expected_owners {
            return Ok(CommitOutcome::Conflict {
                current: bug.status,
            });
        }

        bug.status = change.to_status;
        bug.updated_at = change.at;
        let bug = bug.clone();

        state.next_transition_id += 1;
        let record = StatusTransition {
            id: state.next_transition_id,
            bug_id: change.bug_id,
            from_status: change.from_status,
            to_status: change.to_status,
            comment: change.comment.clone(),
            transitioned_at: change.at,
            changed_by: change.changed_by.clone(),
        };
        state.transitions.push(record.clone());

        Ok(CommitOutcome::Applied { bug, record })
    }

    async fn history(&self, id: BugId) -> Result<Vec<StatusTransition>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .transitions
            .iter()
            .filter(|t| t.bug_id == id)
            .cloned()
            .collect();
        entries.sort_by_key(|t| (t.transitioned_at, t.id));
        Ok(entries)
    }

    async fn status_counts(&self) -> Result<Vec<(BugStatus, u64)>, StoreError> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<BugStatus, u64> = BTreeMap::new();
        for bug in state.bugs.values() {
            *counts.entry(bug.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn transition_counts(&self) -> Result<Vec<(BugStatus, BugStatus, u64)>, StoreError> {
        let state = self.state.read().await;
        let mut counts: BTreeMap<(BugStatus, BugStatus), u64> = BTreeMap::new();
        for t in &state.transitions {
            *counts.entry((t.from_status, t.to_status)).or_default() += 1;
        }
        Ok(counts.into_iter().map(|((from, to), n)| (from, to, n)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Owners;

    fn change(bug_id: BugId, from: BugStatus, to: BugStatus) -> StatusChange {
        StatusChange {
            bug_id,
            from_status: from,
            expected_owners: Owners {
                created_by: Some(UserId::from("u1")),
                assigned_to: None,
            },
            to_status: to,
            comment: None,
            changed_by: Some(UserId::from("u1")),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_applies_status_and_history_together() {
        let store = InMemoryStore::new();
        let bug = store.create_bug(NewBug::open("u1")).await;

        let outcome = store
            .commit_transition(&change(bug.id, BugStatus::Open, BugStatus::InProgress))
            .await
            .unwrap();
        let CommitOutcome::Applied { bug: updated, record } = outcome else {
            panic!("expected commit to apply");
        };
        assert_eq!(updated.status, BugStatus::InProgress);
        assert_eq!(record.from_status, BugStatus::Open);

        let history = store.history(bug.id).await.unwrap();
        assert_eq!(history, vec![record]);
    }

    #[tokio::test]
    async fn test_stale_commit_reports_conflict_without_writing() {
        let store = InMemoryStore::new();
        let bug = store
            .create_bug(NewBug::open("u1").with_status(BugStatus::Testing))
            .await;

        let outcome = store
            .commit_transition(&change(bug.id, BugStatus::Open, BugStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict { current: BugStatus::Testing });
        assert!(store.history(bug.id).await.unwrap().is_empty());
        assert_eq!(store.fetch_bug(bug.id).await.unwrap().unwrap().status, BugStatus::Testing);
    }

    #[tokio::test]
    async fn test_reassignment_after_read_reports_conflict() {
        let store = InMemoryStore::new();
        let bug = store
            .create_bug(NewBug::open("u1").with_status(BugStatus::InProgress).assigned_to("u2"))
            .await;
        let pending = StatusChange::from_bug(&bug, BugStatus::Testing, Some("u2".into()), None);

        assert!(store.assign_bug(bug.id, Some("u3".into())).await);

        let outcome = store.commit_transition(&pending).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict { current: BugStatus::InProgress });
        assert!(store.history(bug.id).await.unwrap().is_empty());

        let stored = store.fetch_bug(bug.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BugStatus::InProgress);
        assert_eq!(stored.assigned_to(), Some(&UserId::from("u3")));
    }

    #[tokio::test]
    async fn test_unknown_bug_is_not_found() {
        let store = InMemoryStore::new();
        let outcome = store
            .commit_transition(&change(BugId(99), BugStatus::Open, BugStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::NotFound);
        assert!(store.history(BugId(99)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let store = InMemoryStore::new();
        let bug = store.create_bug(NewBug::open("u1")).await;
        store
            .commit_transition(&change(bug.id, BugStatus::Open, BugStatus::InProgress))
            .await
            .unwrap();

        assert!(store.delete_bug(bug.id).await);
        assert!(store.history(bug.id).await.unwrap().is_empty());
        assert!(store.transition_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts() {
        let store = InMemoryStore::new();
        let a = store.create_bug(NewBug::open("u1")).await;
        store.create_bug(NewBug::open("u2")).await;
        store
            .commit_transition(&change(a.id, BugStatus::Open, BugStatus::InProgress))
            .await
            .unwrap();

        let statuses = store.status_counts().await.unwrap();
        assert_eq!(statuses, vec![(BugStatus::Open, 1), (BugStatus::InProgress, 1)]);

        let transitions = store.transition_counts().await.unwrap();
        assert_eq!(transitions, vec![(BugStatus::Open, BugStatus::InProgress, 1)]);
    }
}
