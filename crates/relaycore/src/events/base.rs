use crate::{NodeId, WorkflowId, WorkflowStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        status: WorkflowStatus,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeDispatched {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodeSkipped {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_type: Option<String>,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeEvent {
        execution_id: ExecutionId,
        node_id: NodeId,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Messages an executor reports while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
}

/// Event emitter handed to executors
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: NodeId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        node_id: NodeId,
        sender: broadcast::Sender<ExecutionEvent>,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            sender,
        }
    }

    /// Emit a node-specific event
    pub fn emit(&self, event: NodeEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(ExecutionEvent::NodeEvent {
            execution_id: self.execution_id,
            node_id: self.node_id.clone(),
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning {
            message: message.into(),
        });
    }
}

/// Process-wide broadcast of execution events
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn create_emitter(
        &self,
        execution_id: ExecutionId,
        node_id: impl Into<NodeId>,
    ) -> EventEmitter {
        EventEmitter::new(execution_id, node_id.into(), self.sender.clone())
    }
}
