//! Property-based checks for the transition graph and role policy
//!
//! Every combination of statuses, roles and ownership is fair game here;
//! the properties must hold for all of them.

use bug_workflow::workflow::graph::has_edge;
use bug_workflow::workflow::{is_allowed, BugStatus, Role, RolePolicy};
use bug_workflow::{Bug, BugId, UserId};
use chrono::Utc;
use proptest::prelude::*;

fn status() -> impl Strategy<Value = BugStatus> {
    prop::sample::select(BugStatus::ALL.to_vec())
}

fn role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::Admin, Role::User])
}

#[derive(Debug, Clone, Copy)]
enum Relation {
    Creator,
    Assignee,
    Stranger,
}

fn relation() -> impl Strategy<Value = Relation> {
    prop::sample::select(vec![Relation::Creator, Relation::Assignee, Relation::Stranger])
}

fn bug_for(status: BugStatus, relation: Relation, actor: &UserId) -> Bug {
    let now = Utc::now();
    let other = UserId::from("someone-else");
    let (created_by, assigned_to) = match relation {
        Relation::Creator => (actor.clone(), other),
        Relation::Assignee => (other, actor.clone()),
        Relation::Stranger => (other.clone(), other),
    };
    Bug {
        id: BugId(1),
        status,
        created_by: Some(created_by),
        assigned_to: Some(assigned_to),
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #[test]
    fn prop_off_graph_edges_are_never_allowed(
        from in status(),
        to in status(),
        role in role(),
        relation in relation(),
    ) {
        prop_assume!(!has_edge(from, to));
        let actor = UserId::from("actor");
        let bug = bug_for(from, relation, &actor);
        prop_assert!(!is_allowed(from, to, role, &bug, &actor));
    }

    #[test]
    fn prop_admin_may_take_every_graph_edge(
        from in status(),
        to in status(),
        relation in relation(),
    ) {
        let actor = UserId::from("admin");
        let bug = bug_for(from, relation, &actor);
        prop_assert_eq!(is_allowed(from, to, Role::Admin, &bug, &actor), has_edge(from, to));
    }

    #[test]
    fn prop_users_never_act_on_bugs_they_do_not_own(
        from in status(),
        to in status(),
    ) {
        let actor = UserId::from("user");
        let bug = bug_for(from, Relation::Stranger, &actor);
        prop_assert!(!is_allowed(from, to, Role::User, &bug, &actor));
    }

    #[test]
    fn prop_owner_decision_follows_the_policy_table(
        from in status(),
        to in status(),
        relation in prop::sample::select(vec![Relation::Creator, Relation::Assignee]),
    ) {
        let actor = UserId::from("owner");
        let bug = bug_for(from, relation, &actor);
        let granted = RolePolicy::standard()
            .grants_for(from, to)
            .is_some_and(|grants| grants.iter().any(|g| g.role == Role::User));
        prop_assert_eq!(is_allowed(from, to, Role::User, &bug, &actor), granted);
    }

    #[test]
    fn prop_decisions_are_deterministic(
        from in status(),
        to in status(),
        role in role(),
        relation in relation(),
    ) {
        let actor = UserId::from("actor");
        let bug = bug_for(from, relation, &actor);
        let first = is_allowed(from, to, role, &bug, &actor);
        for _ in 0..3 {
            prop_assert_eq!(is_allowed(from, to, role, &bug, &actor), first);
        }
    }

    #[test]
    fn prop_unknown_status_strings_are_rejected(raw in "[a-zA-Z _]{0,16}") {
        let known = BugStatus::ALL
            .iter()
            .any(|s| s.as_str() == raw || s.display_name() == raw);
        prop_assert_eq!(raw.parse::<BugStatus>().is_ok(), known);
    }
}

#[test]
fn test_standard_policy_covers_the_graph() {
    assert!(RolePolicy::standard().uncovered_edges().is_empty());
}
