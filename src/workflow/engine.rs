// Workflow Engine - authorizes and applies status transitions
//
// Authorization and the write are a single call: the policy is evaluated
// against the persisted bug and the commit is guarded by the status that
// was evaluated, so a concurrent change surfaces as a conflict instead of a
// lost update.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn, Instrument};

use super::error::WorkflowError;
use super::graph;
use super::policy::{DenyReason, PolicyDecision, Principal, Role, RolePolicy};
use super::status::BugStatus;
use crate::config::WorkflowSettings;
use crate::model::{Bug, BugId, StatusChange, StatusTransition, UserId};
use crate::observability::workflow_metrics;
use crate::store::{CommitOutcome, WorkflowStore};
use crate::telemetry::{create_workflow_span, generate_correlation_id};

const MOST_COMMON_TRANSITIONS: usize = 5;

/// A committed transition together with the bug as it now stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub bug: Bug,
    pub record: StatusTransition,
}

/// History entry with statuses rendered for people.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub from_status: String,
    pub to_status: String,
    pub comment: Option<String>,
    pub transitioned_at: DateTime<Utc>,
    pub changed_by: Option<UserId>,
}

impl From<&StatusTransition> for HistoryEntry {
    fn from(t: &StatusTransition) -> Self {
        Self {
            id: t.id,
            from_status: t.from_status.display_name().to_string(),
            to_status: t.to_status.display_name().to_string(),
            comment: t.comment.clone(),
            transitioned_at: t.transitioned_at,
            changed_by: t.changed_by.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInfo {
    pub bug_id: BugId,
    pub current_status: String,
    /// Targets this principal may actually take.
    pub allowed_transitions: Vec<String>,
    pub status_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransitionStat {
    pub from: String,
    pub to: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatistics {
    pub total_bugs: u64,
    pub status_distribution: BTreeMap<String, u64>,
    pub most_common_transitions: Vec<TransitionStat>,
}

pub struct WorkflowEngine<S> {
    store: S,
    policy: RolePolicy,
    settings: WorkflowSettings,
}

impl<S: WorkflowStore> WorkflowEngine<S> {
    pub fn new(store: S, settings: WorkflowSettings) -> Result<Self, WorkflowError> {
        Self::with_policy(store, RolePolicy::standard(), settings)
    }

    /// Refuses to start when any graph edge lacks a role policy entry.
    pub fn with_policy(
        store: S,
        policy: RolePolicy,
        settings: WorkflowSettings,
    ) -> Result<Self, WorkflowError> {
        let missing = policy.uncovered_edges();
        if !missing.is_empty() {
            error!(missing = ?missing, "Role policy does not cover every workflow edge");
            return Err(WorkflowError::PolicyMisconfigured { missing });
        }

        Ok(Self {
            store,
            policy,
            settings,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    pub fn display_name(status: BugStatus) -> &'static str {
        status.display_name()
    }

    /// Graph targets from `current`, independent of role.
    pub fn allowed_transitions(&self, current: BugStatus) -> Vec<BugStatus> {
        graph::allowed_targets(current).to_vec()
    }

    pub fn is_allowed(&self, from: BugStatus, to: BugStatus, principal: &Principal, bug: &Bug) -> bool {
        self.policy.evaluate(from, to, principal, bug).is_allowed()
    }

    /// Graph targets from the bug's status that `principal` may take.
    pub fn permitted_transitions(&self, bug: &Bug, principal: &Principal) -> Vec<BugStatus> {
        graph::allowed_targets(bug.status)
            .iter()
            .copied()
            .filter(|to| self.is_allowed(bug.status, *to, principal, bug))
            .collect()
    }

    /// Authorize and apply a transition on the persisted bug.
    pub async fn transition(
        &self,
        bug_id: BugId,
        target: BugStatus,
        principal: &Principal,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let span = create_workflow_span("transition", Some(bug_id), &generate_correlation_id());
        async {
            let bug = self.load_bug(bug_id).await?;

            if let PolicyDecision::Deny(reason) = self.policy.evaluate(bug.status, target, principal, &bug) {
                workflow_metrics().record_denied();
                warn!(
                    user_id = %principal.user_id,
                    role = %principal.role,
                    from = bug.status.as_str(),
                    to = target.as_str(),
                    reason = ?reason,
                    "Transition denied"
                );
                return Err(self.denial(bug.status, target, principal.role, reason));
            }

            self.commit(&bug, target, Some(principal.user_id.clone()), comment).await
        }
        .instrument(span)
        .await
    }

    /// Parse a raw target status before anything else is looked at.
    pub async fn parse_and_transition(
        &self,
        bug_id: BugId,
        raw_target: &str,
        principal: &Principal,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let target: BugStatus = raw_target.parse()?;
        self.transition(bug_id, target, principal, comment).await
    }

    /// Transition with no acting user. The graph still applies; roles do not.
    pub async fn transition_as_system(
        &self,
        bug_id: BugId,
        target: BugStatus,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let span = create_workflow_span("system_transition", Some(bug_id), &generate_correlation_id());
        async {
            let bug = self.load_bug(bug_id).await?;
            if !graph::has_edge(bug.status, target) {
                workflow_metrics().record_denied();
                warn!(from = bug.status.as_str(), to = target.as_str(), "System transition not in graph");
                return Err(WorkflowError::TransitionNotInGraph {
                    from: bug.status,
                    to: target,
                });
            }
            self.commit(&bug, target, None, comment).await
        }
        .instrument(span)
        .await
    }

    /// Ledger for a bug, oldest first. Empty when it never moved.
    pub async fn history(&self, bug_id: BugId) -> Result<Vec<StatusTransition>, WorkflowError> {
        let history = self.store.history(bug_id).await.inspect_err(|e| {
            workflow_metrics().record_persistence_fault();
            error!(bug_id = %bug_id, error = %e, "Failed to load status history");
        })?;
        Ok(history)
    }

    pub async fn workflow_info(
        &self,
        bug_id: BugId,
        principal: &Principal,
    ) -> Result<WorkflowInfo, WorkflowError> {
        let bug = self.load_bug(bug_id).await?;
        let history = self.history(bug_id).await?;

        Ok(WorkflowInfo {
            bug_id,
            current_status: bug.status.display_name().to_string(),
            allowed_transitions: self
                .permitted_transitions(&bug, principal)
                .into_iter()
                .map(|s| s.display_name().to_string())
                .collect(),
            status_history: history.iter().map(HistoryEntry::from).collect(),
        })
    }

    /// Admin-only aggregate view of the workflow.
    pub async fn statistics(&self, principal: &Principal) -> Result<WorkflowStatistics, WorkflowError> {
        if principal.role != Role::Admin {
            return Err(WorkflowError::Forbidden {
                action: "view workflow statistics",
                role: principal.role,
            });
        }

        let counts: BTreeMap<BugStatus, u64> = self.store.status_counts().await?.into_iter().collect();
        let status_distribution = BugStatus::ALL
            .iter()
            .map(|s| (s.display_name().to_string(), counts.get(s).copied().unwrap_or(0)))
            .collect();

        let mut transitions = self.store.transition_counts().await?;
        transitions.sort_by(|a, b| b.2.cmp(&a.2).then((a.0, a.1).cmp(&(b.0, b.1))));
        let most_common_transitions = transitions
            .into_iter()
            .take(MOST_COMMON_TRANSITIONS)
            .map(|(from, to, count)| TransitionStat {
                from: from.display_name().to_string(),
                to: to.display_name().to_string(),
                count,
            })
            .collect();

        Ok(WorkflowStatistics {
            total_bugs: counts.values().sum(),
            status_distribution,
            most_common_transitions,
        })
    }

    async fn load_bug(&self, bug_id: BugId) -> Result<Bug, WorkflowError> {
        self.store
            .fetch_bug(bug_id)
            .await
            .inspect_err(|e| {
                workflow_metrics().record_persistence_fault();
                error!(bug_id = %bug_id, error = %e, "Failed to load bug");
            })?
            .ok_or(WorkflowError::BugNotFound(bug_id))
    }

    fn denial(&self, from: BugStatus, to: BugStatus, role: Role, reason: DenyReason) -> WorkflowError {
        match reason {
            DenyReason::NotInGraph if !self.settings.conceal_topology => {
                WorkflowError::TransitionNotInGraph { from, to }
            }
            _ => WorkflowError::TransitionNotAuthorized { from, to, role },
        }
    }

    async fn commit(
        &self,
        bug: &Bug,
        target: BugStatus,
        changed_by: Option<UserId>,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let change = StatusChange::from_bug(bug, target, changed_by, comment);

        let outcome = self.store.commit_transition(&change).await.inspect_err(|e| {
            workflow_metrics().record_persistence_fault();
            error!(bug_id = %bug.id, error = %e, "Failed to persist transition");
        })?;

        match outcome {
            CommitOutcome::Applied { bug, record } => {
                workflow_metrics().record_applied();
                info!(
                    bug_id = %bug.id,
                    from = record.from_status.as_str(),
                    to = record.to_status.as_str(),
                    changed_by = ?record.changed_by,
                    "Status transition applied"
                );
                Ok(TransitionOutcome { bug, record })
            }
            CommitOutcome::Conflict { current } => {
                workflow_metrics().record_conflict();
                warn!(
                    bug_id = %bug.id,
                    expected = bug.status.as_str(),
                    actual = current.as_str(),
                    "Bug changed concurrently"
                );
                Err(WorkflowError::ConcurrentModification {
                    bug_id: bug.id,
                    expected: bug.status,
                    actual: current,
                })
            }
            CommitOutcome::NotFound => Err(WorkflowError::BugNotFound(bug.id)),
        }
    }
}
