use crate::{ActionError, Field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type WorkflowId = String;
pub type NodeId = String;

/// Node container type that the engine executes. Every other type is
/// editor-only and skipped during a run.
pub const EXECUTABLE_NODE_TYPE: &str = "custom";

/// Lifecycle state of a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Passed => "passed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a display token for a new workflow, e.g. `#3fa91c0d`.
pub fn generate_workflow_id() -> WorkflowId {
    let raw = Uuid::new_v4().simple().to_string();
    format!("#{}", &raw[..8])
}

/// Persisted workflow definition plus the state of its latest run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default = "generate_workflow_id")]
    pub workflow_id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Execution order is the order of this list.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Stored for the editor; never used to order execution.
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub error: Option<String>,
    /// Last captured output per node id.
    #[serde(default)]
    pub results: BTreeMap<NodeId, NodeResult>,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_edited_on: DateTime<Utc>,
    #[serde(default)]
    pub last_executed_on: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: generate_workflow_id(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            status: WorkflowStatus::Pending,
            error: None,
            results: BTreeMap::new(),
            created_on: now,
            last_edited_on: now,
            last_executed_on: None,
        }
    }

    pub fn with_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        self.edges.push(Edge {
            id: format!("e{}-{}", source, target),
            source,
            target,
        });
    }

    /// Enter `running`. Allowed from any state, so finished runs can be repeated.
    pub fn begin_run(&mut self, now: DateTime<Utc>) {
        self.status = WorkflowStatus::Running;
        self.error = None;
        self.last_executed_on = Some(now);
    }

    pub fn complete_run(&mut self) {
        self.status = WorkflowStatus::Passed;
        self.error = None;
    }

    pub fn fail_run(&mut self, error: &ActionError) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error.to_string());
    }

    pub fn record_result(&mut self, node_id: impl Into<NodeId>, result: NodeResult) {
        self.results.insert(node_id.into(), result);
    }

    /// Nodes the engine will hand to an executor lookup, in run order.
    pub fn executable_nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter().filter(|n| n.is_executable())
    }
}

/// A single node in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: NodeData,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: None,
            data: NodeData::default(),
        }
    }

    /// Executable node of the given action kind (`api`, `email`, ...).
    pub fn action(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let mut node = Self::new(id, EXECUTABLE_NODE_TYPE);
        node.data.node_type = Some(kind.into());
        node
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = Some(label.into());
        self
    }

    pub fn with_field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.fields.push(Field::new(label, value));
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    pub fn is_executable(&self) -> bool {
        self.node_type == EXECUTABLE_NODE_TYPE
    }

    /// Action kind used for dispatch, only for executable nodes.
    pub fn action_kind(&self) -> Option<&str> {
        if !self.is_executable() {
            return None;
        }
        self.data.node_type.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Stored relationship between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

/// Node position in visual editor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Output captured from a node's last successful execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub response: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub recorded_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_values() {
        for (status, wire) in [
            (WorkflowStatus::Pending, "\"pending\""),
            (WorkflowStatus::Running, "\"running\""),
            (WorkflowStatus::Passed, "\"passed\""),
            (WorkflowStatus::Failed, "\"failed\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
        }
    }

    #[test]
    fn test_deserialize_editor_document() {
        let doc = json!({
            "workflowId": "#1234",
            "name": "Notify",
            "nodes": [
                {
                    "id": "1",
                    "type": "custom",
                    "position": {"x": 10.0, "y": 20.0},
                    "data": {
                        "label": "Call API",
                        "nodeType": "api",
                        "fields": [{"label": "Endpoint", "value": "https://example.test"}]
                    }
                },
                {"id": "2", "type": "input", "data": {"label": "Start"}}
            ],
            "edges": [{"id": "e1-2", "source": "1", "target": "2"}],
            "status": "failed",
            "error": "ApiError: boom"
        });

        let workflow: Workflow = serde_json::from_value(doc).unwrap();
        assert_eq!(workflow.workflow_id, "#1234");
        assert_eq!(workflow.status, WorkflowStatus::Failed);
        assert_eq!(workflow.nodes[0].action_kind(), Some("api"));
        assert_eq!(workflow.nodes[1].action_kind(), None);
        assert_eq!(workflow.executable_nodes().count(), 1);
        assert!(workflow.last_executed_on.is_none());
        assert!(workflow.results.is_empty());
    }

    #[test]
    fn test_serialize_uses_camel_case() {
        let workflow = Workflow::new("Example").with_id("#0001");
        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(value["workflowId"], "#0001");
        assert_eq!(value["status"], "pending");
        assert!(value["lastExecutedOn"].is_null());
        assert!(value.get("createdOn").is_some());
    }

    #[test]
    fn test_run_transitions() {
        let mut workflow = Workflow::new("Example");
        workflow.fail_run(&ActionError::Api("down".to_string()));
        assert_eq!(workflow.status, WorkflowStatus::Failed);
        assert_eq!(workflow.error.as_deref(), Some("ApiError: down"));

        workflow.begin_run(Utc::now());
        assert_eq!(workflow.status, WorkflowStatus::Running);
        assert!(workflow.error.is_none());
        assert!(workflow.last_executed_on.is_some());

        workflow.complete_run();
        assert_eq!(workflow.status, WorkflowStatus::Passed);
        assert!(workflow.error.is_none());
    }

    #[test]
    fn test_generated_ids_are_tokens() {
        let id = generate_workflow_id();
        assert!(id.starts_with('#'));
        assert_eq!(id.len(), 9);
        assert_ne!(id, generate_workflow_id());
    }
}
