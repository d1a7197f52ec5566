use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Counters for workflow engine outcomes
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub transitions_applied: AtomicU64,
    pub transitions_denied: AtomicU64,
    pub conflicts: AtomicU64,
    pub persistence_faults: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denied(&self) {
        self.transitions_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_fault(&self) {
        self.persistence_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            transitions_denied: self.transitions_denied.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            persistence_faults: self.persistence_faults.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: applied={}, denied={}, conflicts={}, persistence_faults={}",
            stats.transitions_applied,
            stats.transitions_denied,
            stats.conflicts,
            stats.persistence_faults
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStats {
    pub transitions_applied: u64,
    pub transitions_denied: u64,
    pub conflicts: u64,
    pub persistence_faults: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = WorkflowMetrics::new();
        metrics.record_applied();
        metrics.record_applied();
        metrics.record_denied();
        metrics.record_conflict();

        let stats = metrics.get_stats();
        assert_eq!(stats.transitions_applied, 2);
        assert_eq!(stats.transitions_denied, 1);
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.persistence_faults, 0);
    }
}
