// Bug status workflow: states, transition graph, role policy and the engine
// that applies transitions against a store.

pub mod engine;
pub mod error;
pub mod graph;
pub mod policy;
pub mod status;

pub use engine::{
    HistoryEntry, TransitionOutcome, TransitionStat, WorkflowEngine, WorkflowInfo, WorkflowStatistics,
};
pub use error::WorkflowError;
pub use graph::{allowed_targets, diagram, WorkflowDiagram};
pub use policy::{is_allowed, DenyReason, PolicyDecision, Principal, Role, RoleGrant, RolePolicy};
pub use status::{all_statuses, display_name, BugStatus, StatusInfo};
