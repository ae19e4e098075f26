use crate::{events::EventEmitter, ActionError, Field, NodeId, NodeResult, WorkflowId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Performs the side effect of one node kind
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Action kind this executor handles (e.g. "api", "email")
    fn node_type(&self) -> &str;

    /// Execute one node
    async fn execute(&self, ctx: ActionContext) -> Result<ActionOutput, ActionError>;

    /// Optional: release resources held for the current run
    async fn shutdown(&self) {}
}

/// Execution context passed to each executor
#[derive(Clone)]
pub struct ActionContext {
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,

    /// Raw parameter list of the node
    pub fields: Vec<Field>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl ActionContext {
    pub fn new(
        workflow_id: impl Into<WorkflowId>,
        node_id: impl Into<NodeId>,
        fields: Vec<Field>,
        events: EventEmitter,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            node_id: node_id.into(),
            fields,
            events,
        }
    }
}

/// Output of a successful node execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    pub response: Option<serde_json::Value>,
    pub status: Option<u16>,
}

impl ActionOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, status: u16, response: serde_json::Value) -> Self {
        self.status = Some(status);
        self.response = Some(response);
        self
    }

    /// Sidecar entry for this output; `None` when nothing was captured.
    pub fn to_result(&self, recorded_on: DateTime<Utc>) -> Option<NodeResult> {
        self.response.as_ref().map(|response| NodeResult {
            response: response.clone(),
            status: self.status,
            recorded_on,
        })
    }
}
