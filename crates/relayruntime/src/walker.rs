use crate::registry::Dispatch;
use chrono::Utc;
use relaycore::{
    ActionContext, ActionError, ActionOutput, EventBus, ExecutionEvent, ExecutionId, NodeId,
    NodeSpec, Workflow,
};
use std::time::Instant;

/// Walks a workflow's nodes in list order, one at a time
///
/// Edges are not consulted. Each node is awaited before the next one starts
/// and the walk stops at the first failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphWalker;

impl GraphWalker {
    pub fn new() -> Self {
        Self
    }

    pub async fn walk(
        &self,
        workflow: &Workflow,
        dispatch: &Dispatch,
        event_bus: &EventBus,
        execution_id: ExecutionId,
    ) -> WalkReport {
        let mut report = WalkReport::default();

        for node in &workflow.nodes {
            let Some(kind) = node.action_kind() else {
                self.skip(node, event_bus, execution_id, &mut report);
                continue;
            };

            let executor = match dispatch.lookup(kind) {
                None => {
                    self.skip(node, event_bus, execution_id, &mut report);
                    continue;
                }
                Some(Err(e)) => {
                    self.fail(node, e, event_bus, execution_id, &mut report);
                    return report;
                }
                Some(Ok(executor)) => executor,
            };

            event_bus.emit(ExecutionEvent::NodeDispatched {
                execution_id,
                node_id: node.id.clone(),
                node_type: kind.to_string(),
                timestamp: Utc::now(),
            });
            tracing::info!(
                workflow_id = %workflow.workflow_id,
                node_id = %node.id,
                node_type = kind,
                "Dispatching node"
            );
            report.dispatched += 1;

            let ctx = ActionContext::new(
                workflow.workflow_id.clone(),
                node.id.clone(),
                node.data.fields.clone(),
                event_bus.create_emitter(execution_id, node.id.clone()),
            );

            let start = Instant::now();
            match executor.execute(ctx).await {
                Ok(output) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    tracing::info!("Node {} completed in {}ms", node.id, duration_ms);
                    event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: node.id.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    report.outputs.push((node.id.clone(), output));
                }
                Err(e) => {
                    self.fail(node, e, event_bus, execution_id, &mut report);
                    return report;
                }
            }
        }

        report
    }

    fn skip(
        &self,
        node: &NodeSpec,
        event_bus: &EventBus,
        execution_id: ExecutionId,
        report: &mut WalkReport,
    ) {
        tracing::debug!(
            node_id = %node.id,
            node_type = ?node.data.node_type,
            "Skipping node without executor"
        );
        event_bus.emit(ExecutionEvent::NodeSkipped {
            execution_id,
            node_id: node.id.clone(),
            node_type: node.data.node_type.clone(),
            timestamp: Utc::now(),
        });
        report.skipped += 1;
    }

    fn fail(
        &self,
        node: &NodeSpec,
        error: ActionError,
        event_bus: &EventBus,
        execution_id: ExecutionId,
        report: &mut WalkReport,
    ) {
        tracing::error!(node_id = %node.id, "Node failed: {}", error);
        event_bus.emit(ExecutionEvent::NodeFailed {
            execution_id,
            node_id: node.id.clone(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        report.outcome = WalkOutcome::Failure {
            node_id: node.id.clone(),
            error,
        };
    }
}

/// Terminal outcome of a walk
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WalkOutcome {
    #[default]
    Success,
    Failure { node_id: NodeId, error: ActionError },
}

/// Result of walking a workflow
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    pub outcome: WalkOutcome,
    /// Outputs of nodes that completed, in run order
    pub outputs: Vec<(NodeId, ActionOutput)>,
    pub dispatched: usize,
    pub skipped: usize,
}

impl WalkReport {
    pub fn is_success(&self) -> bool {
        self.outcome == WalkOutcome::Success
    }
}
