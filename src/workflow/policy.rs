// Authorization Policy - who may walk which edge of the transition graph
//
// Evaluation order is fixed and short-circuits:
//   1. edge must exist in the graph (admin included)
//   2. edge must carry a policy entry (fail closed otherwise)
//   3. admin is allowed
//   4. role must be granted on the edge
//   5. non-exempt grants also require creator/assignee ownership

use serde::{Deserialize, Serialize};
use std::fmt;

use super::graph;
use super::status::BugStatus;
use crate::model::{Bug, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Maps a role claim to a policy role. Only `"admin"` is privileged;
    /// every other value is treated as the default role.
    pub fn from_claim(claim: &str) -> Self {
        if claim == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The acting user for a workflow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::User)
    }

    pub fn from_claims(user_id: &str, role: &str) -> Self {
        Self::new(user_id, Role::from_claim(role))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipRule {
    Required,
    Exempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: Role,
    pub ownership: OwnershipRule,
}

impl RoleGrant {
    pub const fn owned(role: Role) -> Self {
        Self {
            role,
            ownership: OwnershipRule::Required,
        }
    }

    pub const fn exempt(role: Role) -> Self {
        Self {
            role,
            ownership: OwnershipRule::Exempt,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyEntry {
    pub from: BugStatus,
    pub to: BugStatus,
    pub grants: &'static [RoleGrant],
}

const OWNER_OR_ADMIN: &[RoleGrant] = &[RoleGrant::owned(Role::User), RoleGrant::owned(Role::Admin)];
const ADMIN_ONLY: &[RoleGrant] = &[RoleGrant::owned(Role::Admin)];

const fn entry(from: BugStatus, to: BugStatus, grants: &'static [RoleGrant]) -> PolicyEntry {
    PolicyEntry { from, to, grants }
}

static STANDARD_POLICY: [PolicyEntry; 14] = [
    entry(BugStatus::Open, BugStatus::InProgress, OWNER_OR_ADMIN),
    entry(BugStatus::Open, BugStatus::Rejected, ADMIN_ONLY),
    entry(BugStatus::InProgress, BugStatus::Testing, OWNER_OR_ADMIN),
    entry(BugStatus::InProgress, BugStatus::OnHold, OWNER_OR_ADMIN),
    entry(BugStatus::InProgress, BugStatus::Open, OWNER_OR_ADMIN),
    entry(BugStatus::Testing, BugStatus::Completed, ADMIN_ONLY),
    entry(BugStatus::Testing, BugStatus::Failed, ADMIN_ONLY),
    entry(BugStatus::Completed, BugStatus::Reopened, ADMIN_ONLY),
    entry(BugStatus::Rejected, BugStatus::Reopened, ADMIN_ONLY),
    entry(BugStatus::OnHold, BugStatus::InProgress, OWNER_OR_ADMIN),
    entry(BugStatus::OnHold, BugStatus::Rejected, ADMIN_ONLY),
    entry(BugStatus::Failed, BugStatus::InProgress, OWNER_OR_ADMIN),
    entry(BugStatus::Reopened, BugStatus::InProgress, OWNER_OR_ADMIN),
    entry(BugStatus::Reopened, BugStatus::Rejected, ADMIN_ONLY),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenyReason {
    NotInGraph,
    NoPolicyEntry,
    RoleNotPermitted,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(DenyReason),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// Immutable role table keyed by graph edge.
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy {
    entries: &'static [PolicyEntry],
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RolePolicy {
    pub fn standard() -> Self {
        Self {
            entries: &STANDARD_POLICY,
        }
    }

    pub fn from_entries(entries: &'static [PolicyEntry]) -> Self {
        Self { entries }
    }

    pub fn grants_for(&self, from: BugStatus, to: BugStatus) -> Option<&'static [RoleGrant]> {
        self.entries
            .iter()
            .find(|e| e.from == from && e.to == to)
            .map(|e| e.grants)
    }

    pub fn evaluate(
        &self,
        from: BugStatus,
        to: BugStatus,
        principal: &Principal,
        bug: &Bug,
    ) -> PolicyDecision {
        if !graph::has_edge(from, to) {
            return PolicyDecision::Deny(DenyReason::NotInGraph);
        }

        let Some(grants) = self.grants_for(from, to) else {
            return PolicyDecision::Deny(DenyReason::NoPolicyEntry);
        };

        if principal.role == Role::Admin {
            return PolicyDecision::Allow;
        }

        let Some(grant) = grants.iter().find(|g| g.role == principal.role) else {
            return PolicyDecision::Deny(DenyReason::RoleNotPermitted);
        };

        match grant.ownership {
            OwnershipRule::Exempt => PolicyDecision::Allow,
            OwnershipRule::Required if bug.is_owned_by(&principal.user_id) => PolicyDecision::Allow,
            OwnershipRule::Required => PolicyDecision::Deny(DenyReason::NotOwner),
        }
    }

    pub fn is_allowed(
        &self,
        from: BugStatus,
        to: BugStatus,
        role: Role,
        bug: &Bug,
        user_id: &UserId,
    ) -> bool {
        let principal = Principal::new(user_id.clone(), role);
        self.evaluate(from, to, &principal, bug).is_allowed()
    }

    /// Graph edges with no policy entry. Non-empty means those edges are
    /// unreachable for everyone, admin included.
    pub fn uncovered_edges(&self) -> Vec<(BugStatus, BugStatus)> {
        graph::edges()
            .filter(|(from, to)| self.grants_for(*from, *to).is_none())
            .collect()
    }
}

/// Decision against the standard policy table.
pub fn is_allowed(from: BugStatus, to: BugStatus, role: Role, bug: &Bug, user_id: &UserId) -> bool {
    RolePolicy::standard().is_allowed(from, to, role, bug, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::model::BugId;
    use BugStatus::*;

    fn bug_owned_by(creator: &str, assignee: Option<&str>, status: BugStatus) -> Bug {
        let now = Utc::now();
        Bug {
            id: BugId(7),
            status,
            created_by: Some(creator.into()),
            assigned_to: assignee.map(UserId::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_from_claim() {
        assert_eq!(Role::from_claim("admin"), Role::Admin);
        assert_eq!(Role::from_claim("user"), Role::User);
        assert_eq!(Role::from_claim("tester"), Role::User);
        assert_eq!(Role::from_claim("Admin"), Role::User);
        assert_eq!(Role::from_claim(""), Role::User);
    }

    #[test]
    fn test_standard_policy_covers_every_edge() {
        assert!(RolePolicy::standard().uncovered_edges().is_empty());
    }

    #[test]
    fn test_testing_to_completed_is_admin_only() {
        let bug = bug_owned_by("creator", Some("dev"), Testing);
        let uid = |s: &str| UserId::from(s);

        assert!(!is_allowed(Testing, Completed, Role::User, &bug, &uid("stranger")));
        assert!(!is_allowed(Testing, Completed, Role::User, &bug, &uid("dev")));
        assert!(!is_allowed(Testing, Completed, Role::User, &bug, &uid("creator")));
        assert!(is_allowed(Testing, Completed, Role::Admin, &bug, &uid("stranger")));

        let decision = RolePolicy::standard().evaluate(Testing, Completed, &Principal::user("dev"), &bug);
        assert_eq!(decision, PolicyDecision::Deny(DenyReason::RoleNotPermitted));
    }

    #[test]
    fn test_open_to_in_progress_requires_ownership_for_users() {
        let bug = bug_owned_by("u1", None, Open);
        let policy = RolePolicy::standard();

        assert_eq!(policy.evaluate(Open, InProgress, &Principal::user("u1"), &bug), PolicyDecision::Allow);
        assert_eq!(
            policy.evaluate(Open, InProgress, &Principal::user("u2"), &bug),
            PolicyDecision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(policy.evaluate(Open, InProgress, &Principal::admin("root"), &bug), PolicyDecision::Allow);
    }

    #[test]
    fn test_assignee_counts_as_owner() {
        let bug = bug_owned_by("u1", Some("u9"), InProgress);
        assert!(is_allowed(InProgress, Testing, Role::User, &bug, &"u9".into()));
    }

    #[test]
    fn test_graph_check_precedes_admin_bypass() {
        let bug = bug_owned_by("u1", None, Open);
        let decision = RolePolicy::standard().evaluate(Open, Completed, &Principal::admin("root"), &bug);
        assert_eq!(decision, PolicyDecision::Deny(DenyReason::NotInGraph));
    }

    static PARTIAL: [PolicyEntry; 1] = [PolicyEntry {
        from: Open,
        to: InProgress,
        grants: &[RoleGrant::exempt(Role::User)],
    }];

    #[test]
    fn test_missing_entry_fails_closed_even_for_admin() {
        let policy = RolePolicy::from_entries(&PARTIAL);
        let bug = bug_owned_by("u1", None, Open);

        assert_eq!(
            policy.evaluate(Open, Rejected, &Principal::admin("root"), &bug),
            PolicyDecision::Deny(DenyReason::NoPolicyEntry)
        );
        assert_eq!(policy.uncovered_edges().len(), 13);
    }

    #[test]
    fn test_exempt_grant_skips_ownership() {
        let policy = RolePolicy::from_entries(&PARTIAL);
        let bug = bug_owned_by("u1", None, Open);
        assert_eq!(
            policy.evaluate(Open, InProgress, &Principal::user("stranger"), &bug),
            PolicyDecision::Allow
        );
    }
}
