use thiserror::Error;

use super::policy::Role;
use super::status::BugStatus;
use crate::model::BugId;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid status value: {value:?}")]
    InvalidStatusValue { value: String },

    #[error("Transition from {from} to {to} is not part of the workflow")]
    TransitionNotInGraph { from: BugStatus, to: BugStatus },

    #[error("Role {role} is not permitted to move this bug from {from} to {to}")]
    TransitionNotAuthorized {
        from: BugStatus,
        to: BugStatus,
        role: Role,
    },

    #[error("Role {role} may not {action}")]
    Forbidden { action: &'static str, role: Role },

    #[error("Bug {0} not found")]
    BugNotFound(BugId),

    #[error("Bug {bug_id} changed concurrently: evaluated at status {expected}, now {actual}")]
    ConcurrentModification {
        bug_id: BugId,
        expected: BugStatus,
        actual: BugStatus,
    },

    #[error("Workflow edges without a role policy: {}", format_edges(.missing))]
    PolicyMisconfigured { missing: Vec<(BugStatus, BugStatus)> },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl WorkflowError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Persistence(_) | WorkflowError::ConcurrentModification { .. }
        )
    }

    /// Whether the request was refused by the workflow rules rather than failing.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            WorkflowError::TransitionNotInGraph { .. }
                | WorkflowError::TransitionNotAuthorized { .. }
                | WorkflowError::Forbidden { .. }
        )
    }
}

fn format_edges(edges: &[(BugStatus, BugStatus)]) -> String {
    edges
        .iter()
        .map(|(from, to)| format!("{} -> {}", from.as_str(), to.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_use_display_names() {
        let err = WorkflowError::TransitionNotAuthorized {
            from: BugStatus::Testing,
            to: BugStatus::Completed,
            role: Role::User,
        };
        assert_eq!(
            err.to_string(),
            "Role user is not permitted to move this bug from Testing to Completed"
        );

        let err = WorkflowError::TransitionNotInGraph {
            from: BugStatus::OnHold,
            to: BugStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Transition from On Hold to Completed is not part of the workflow"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(WorkflowError::Persistence(StoreError::Unavailable("down".into())).is_retryable());
        assert!(WorkflowError::ConcurrentModification {
            bug_id: BugId(1),
            expected: BugStatus::Testing,
            actual: BugStatus::Completed,
        }
        .is_retryable());
        assert!(!WorkflowError::BugNotFound(BugId(1)).is_retryable());
        assert!(!WorkflowError::InvalidStatusValue { value: "x".into() }.is_retryable());
    }

    #[test]
    fn test_misconfiguration_lists_edges() {
        let err = WorkflowError::PolicyMisconfigured {
            missing: vec![(BugStatus::Open, BugStatus::InProgress)],
        };
        assert!(err.to_string().contains("Open -> InProgress"));
    }
}
