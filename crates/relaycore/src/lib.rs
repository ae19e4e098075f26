//! Core types for the relay workflow engine
//!
//! Workflow documents, the field resolver, typed node actions, the executor
//! trait and execution events. Every other crate builds on these.

pub mod action;
mod error;
pub mod events;
pub mod fields;
mod node;
mod workflow;

pub use action::{ApiAction, EmailAction};
pub use error::{ActionError, ExecutionError, StoreError, WorkflowError};
pub use events::*;
pub use fields::Field;
pub use node::{ActionContext, ActionExecutor, ActionOutput};
pub use workflow::{
    generate_workflow_id, Edge, NodeData, NodeId, NodeResult, NodeSpec, Position, Workflow,
    WorkflowId, WorkflowStatus, EXECUTABLE_NODE_TYPE,
};
