use dashmap::DashSet;
use relaycore::WorkflowId;
use std::sync::Arc;

/// Tracks which workflows currently have a run in progress
#[derive(Clone, Default)]
pub struct LeaseTable {
    active: Arc<DashSet<WorkflowId>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `workflow_id`, or `None` if another run holds it.
    pub fn acquire(&self, workflow_id: &str) -> Option<Lease> {
        if !self.active.insert(workflow_id.to_string()) {
            return None;
        }
        Some(Lease {
            workflow_id: workflow_id.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_held(&self, workflow_id: &str) -> bool {
        self.active.contains(workflow_id)
    }
}

/// Released on drop
pub struct Lease {
    workflow_id: WorkflowId,
    active: Arc<DashSet<WorkflowId>>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.active.remove(&self.workflow_id);
    }
}
