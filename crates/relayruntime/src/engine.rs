use crate::lease::LeaseTable;
use crate::registry::ExecutorRegistry;
use crate::store::WorkflowStore;
use crate::walker::{GraphWalker, WalkOutcome};
use chrono::Utc;
use relaycore::{EventBus, ExecutionError, ExecutionEvent, ExecutionId, Workflow};
use std::sync::Arc;
use std::time::Instant;

/// Runs workflows and owns their lifecycle state
///
/// A run moves the stored workflow to `running`, walks its nodes, and
/// finishes in `passed` or `failed`. Only one run per workflow id may be in
/// progress; a second start is rejected with [`ExecutionError::Conflict`].
pub struct WorkflowEngine {
    registry: Arc<ExecutorRegistry>,
    store: Arc<dyn WorkflowStore>,
    walker: GraphWalker,
    event_bus: Arc<EventBus>,
    leases: LeaseTable,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<ExecutorRegistry>, store: Arc<dyn WorkflowStore>) -> Self {
        Self::with_config(registry, store, RuntimeConfig::default())
    }

    pub fn with_config(
        registry: Arc<ExecutorRegistry>,
        store: Arc<dyn WorkflowStore>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            store,
            walker: GraphWalker::new(),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            leases: LeaseTable::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn is_running(&self, workflow_id: &str) -> bool {
        self.leases.is_held(workflow_id)
    }

    /// Execute a stored workflow and return it in its final state
    pub async fn execute_workflow(&self, workflow_id: &str) -> Result<Workflow, ExecutionError> {
        let _lease = self
            .leases
            .acquire(workflow_id)
            .ok_or_else(|| ExecutionError::Conflict(workflow_id.to_string()))?;

        let mut workflow = self
            .store
            .find_by_workflow_id(workflow_id)
            .await?
            .ok_or_else(|| ExecutionError::NotFound(workflow_id.to_string()))?;

        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        workflow.begin_run(Utc::now());
        self.store.save(&workflow).await?;

        tracing::info!(
            workflow_id = %workflow.workflow_id,
            %execution_id,
            nodes = workflow.nodes.len(),
            "Starting workflow run"
        );
        self.event_bus.emit(ExecutionEvent::RunStarted {
            execution_id,
            workflow_id: workflow.workflow_id.clone(),
            timestamp: Utc::now(),
        });

        let dispatch = self.registry.dispatch_for(&workflow);
        let report = self
            .walker
            .walk(&workflow, &dispatch, &self.event_bus, execution_id)
            .await;
        dispatch.shutdown().await;

        let recorded_on = Utc::now();
        for (node_id, output) in &report.outputs {
            if let Some(result) = output.to_result(recorded_on) {
                workflow.record_result(node_id.clone(), result);
            }
        }

        let outcome = match report.outcome {
            WalkOutcome::Success => {
                workflow.complete_run();
                Ok(())
            }
            WalkOutcome::Failure { node_id, error } => {
                workflow.fail_run(&error);
                Err(ExecutionError::Failed { node_id, error })
            }
        };

        if let Err(e) = self.store.save(&workflow).await {
            tracing::error!(
                workflow_id = %workflow.workflow_id,
                "Failed to persist {} run: {}",
                workflow.status,
                e
            );
            return Err(e.into());
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            workflow_id = %workflow.workflow_id,
            %execution_id,
            status = %workflow.status,
            dispatched = report.dispatched,
            skipped = report.skipped,
            duration_ms,
            "Workflow run finished"
        );
        self.event_bus.emit(ExecutionEvent::RunCompleted {
            execution_id,
            workflow_id: workflow.workflow_id.clone(),
            status: workflow.status,
            duration_ms,
            timestamp: Utc::now(),
        });

        outcome.map(|_| workflow)
    }
}

/// Configuration for the engine
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
}

impl RuntimeConfig {
    /// Read `EVENT_BUFFER_SIZE`, falling back to the default when unset or invalid
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = std::env::var("EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|size: &usize| *size > 0)
        {
            config.event_buffer_size = size;
        }
        config
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
