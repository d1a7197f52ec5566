// Transition Graph - fixed, hand-curated status edges
// Cycles are intentional (Completed -> Reopened -> InProgress -> Testing -> Completed).

use serde::Serialize;

use super::status::BugStatus;

const FROM_OPEN: &[BugStatus] = &[BugStatus::InProgress, BugStatus::Rejected];
const FROM_IN_PROGRESS: &[BugStatus] = &[BugStatus::Testing, BugStatus::OnHold, BugStatus::Open];
const FROM_TESTING: &[BugStatus] = &[BugStatus::Completed, BugStatus::Failed];
const FROM_COMPLETED: &[BugStatus] = &[BugStatus::Reopened];
const FROM_REJECTED: &[BugStatus] = &[BugStatus::Reopened];
const FROM_ON_HOLD: &[BugStatus] = &[BugStatus::InProgress, BugStatus::Rejected];
const FROM_FAILED: &[BugStatus] = &[BugStatus::InProgress];
const FROM_REOPENED: &[BugStatus] = &[BugStatus::InProgress, BugStatus::Rejected];

/// Statuses reachable in one step from `from`, in declaration order.
pub fn allowed_targets(from: BugStatus) -> &'static [BugStatus] {
    match from {
        BugStatus::Open => FROM_OPEN,
        BugStatus::InProgress => FROM_IN_PROGRESS,
        BugStatus::Testing => FROM_TESTING,
        BugStatus::Completed => FROM_COMPLETED,
        BugStatus::Rejected => FROM_REJECTED,
        BugStatus::OnHold => FROM_ON_HOLD,
        BugStatus::Failed => FROM_FAILED,
        BugStatus::Reopened => FROM_REOPENED,
    }
}

pub fn has_edge(from: BugStatus, to: BugStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Every edge of the graph, grouped by source status in ordinal order.
pub fn edges() -> impl Iterator<Item = (BugStatus, BugStatus)> {
    BugStatus::ALL
        .into_iter()
        .flat_map(|from| allowed_targets(from).iter().map(move |to| (from, *to)))
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
    pub description: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagramEdge {
    pub from: String,
    pub to: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

pub fn diagram() -> WorkflowDiagram {
    let nodes = BugStatus::ALL
        .iter()
        .map(|status| DiagramNode {
            id: status.as_str().to_string(),
            label: status.display_name().to_string(),
            description: status.description().to_string(),
            color: status.color().to_string(),
        })
        .collect();

    let edges = edges()
        .map(|(from, to)| DiagramEdge {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            label: format!("{} → {}", from.display_name(), to.display_name()),
        })
        .collect();

    WorkflowDiagram { nodes, edges }
}
