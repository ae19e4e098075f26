use thiserror::Error;

/// Failure of a single node's action.
///
/// The `Display` form is the string recorded in a failed workflow's `error`
/// field, e.g. `EmailError: SMTP timeout`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("ParseError: {0}")]
    Parse(String),

    #[error("ApiError: {0}")]
    Api(String),

    #[error("EmailError: {0}")]
    Email(String),
}

impl ActionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::Parse(_) => "ParseError",
            ActionError::Api(_) => "ApiError",
            ActionError::Email(_) => "EmailError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ActionError::Parse(m) | ActionError::Api(m) | ActionError::Email(m) => m,
        }
    }
}

/// Structural problems found when validating a workflow's topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Edge {edge} references unknown node: {node}")]
    DanglingEdge { edge: String, node: String },

    #[error("Cyclic dependency detected")]
    CyclicDependency,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Workflow already exists: {0}")]
    Duplicate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error returned to callers of a workflow execution.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Workflow {0} is already running")]
    Conflict(String),

    #[error("Node {node_id} failed: {error}")]
    Failed { node_id: String, error: ActionError },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}
