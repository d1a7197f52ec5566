// Bug Workflow Library - status lifecycle engine for a bug tracker
// This exposes the core components for embedding and integration tests

pub mod config;
pub mod model;
pub mod observability;
pub mod store;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, BugWorkflowConfig, WorkflowSettings};
pub use model::{Bug, BugId, NewBug, Owners, StatusChange, StatusTransition, UserId};
pub use observability::{workflow_metrics, WorkflowMetrics};
pub use store::{CommitOutcome, InMemoryStore, StoreError, WorkflowStore};
#[cfg(feature = "database")]
pub use store::SqliteStore;
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    BugStatus, Principal, Role, RolePolicy, TransitionOutcome, WorkflowEngine, WorkflowError,
};
