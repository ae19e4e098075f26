//! Workflow execution runtime
//!
//! The executor registry, the graph walker, the lifecycle engine that drives
//! a workflow from `running` to `passed` or `failed`, and the stores it
//! persists through.

mod engine;
mod file_store;
mod lease;
mod registry;
mod store;
mod topology;
mod walker;

pub use engine::{RuntimeConfig, WorkflowEngine};
pub use file_store::JsonFileStore;
pub use lease::{Lease, LeaseTable};
pub use registry::{Dispatch, ExecutorFactory, ExecutorMetadata, ExecutorRegistry};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
pub use topology::Topology;
pub use walker::{GraphWalker, WalkOutcome, WalkReport};
