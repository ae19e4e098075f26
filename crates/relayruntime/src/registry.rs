use relaycore::{ActionError, ActionExecutor, Workflow};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for opening executors
///
/// `create` is called once per run for every kind that run needs, so an
/// executor may hold connections scoped to that run.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn ActionExecutor>, ActionError>;

    /// Action kind identifier
    fn node_type(&self) -> &str;

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata::default()
    }
}

/// Metadata about an action kind
#[derive(Debug, Clone)]
pub struct ExecutorMetadata {
    pub description: String,
    pub category: String,
}

impl Default for ExecutorMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Registry of available action kinds
pub struct ExecutorRegistry {
    factories: HashMap<String, Arc<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn ExecutorFactory>) {
        let node_type = factory.node_type().to_string();
        tracing::info!("Registering action kind: {}", node_type);
        self.factories.insert(node_type, factory);
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Registered kinds, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn get_metadata(&self, node_type: &str) -> Option<ExecutorMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }

    /// Open one executor per registered kind used by `workflow`.
    ///
    /// A factory that fails to open leaves an unavailable slot; the first
    /// node of that kind fails with the factory's error.
    pub fn dispatch_for(&self, workflow: &Workflow) -> Dispatch {
        let mut dispatch = Dispatch::new();

        for kind in workflow.executable_nodes().filter_map(|n| n.action_kind()) {
            if dispatch.contains(kind) {
                continue;
            }
            let Some(factory) = self.factories.get(kind) else {
                continue;
            };
            match factory.create() {
                Ok(executor) => dispatch.insert(executor),
                Err(e) => {
                    tracing::warn!("Failed to open executor for {}: {}", kind, e);
                    dispatch.insert_unavailable(kind, e);
                }
            }
        }

        dispatch
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

enum Slot {
    Ready(Box<dyn ActionExecutor>),
    Unavailable(ActionError),
}

/// Dispatch table for one run: action kind → executor
pub struct Dispatch {
    slots: HashMap<String, Slot>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    pub fn with_executor(mut self, executor: Box<dyn ActionExecutor>) -> Self {
        self.insert(executor);
        self
    }

    pub fn insert(&mut self, executor: Box<dyn ActionExecutor>) {
        let kind = executor.node_type().to_string();
        self.slots.insert(kind, Slot::Ready(executor));
    }

    pub fn insert_unavailable(&mut self, kind: impl Into<String>, error: ActionError) {
        self.slots.insert(kind.into(), Slot::Unavailable(error));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.slots.contains_key(kind)
    }

    /// `None` when no executor is registered for `kind`.
    pub fn lookup(&self, kind: &str) -> Option<Result<&dyn ActionExecutor, ActionError>> {
        self.slots.get(kind).map(|slot| match slot {
            Slot::Ready(executor) => Ok(executor.as_ref()),
            Slot::Unavailable(e) => Err(e.clone()),
        })
    }

    /// Release run-scoped resources of every opened executor
    pub async fn shutdown(&self) {
        for slot in self.slots.values() {
            if let Slot::Ready(executor) = slot {
                executor.shutdown().await;
            }
        }
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}
