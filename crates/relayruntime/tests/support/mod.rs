// Shared stubs for the runtime integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use relaycore::{ActionContext, ActionError, ActionExecutor, ActionOutput};
use relayruntime::ExecutorFactory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct StubState {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, ActionError>>,
    response: Mutex<Option<serde_json::Value>>,
    shutdowns: AtomicUsize,
    opened: AtomicUsize,
    gate: Option<Gate>,
}

/// Blocks `execute` until released, signalling when a call has entered
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Executor that records every node it sees and fails on demand
#[derive(Clone)]
pub struct StubExecutor {
    kind: String,
    state: Arc<StubState>,
}

impl StubExecutor {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            state: Arc::new(StubState::default()),
        }
    }

    pub fn gated(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            state: Arc::new(StubState {
                gate: Some(Gate {
                    entered: Notify::new(),
                    release: Notify::new(),
                }),
                ..StubState::default()
            }),
        }
    }

    pub fn respond_with(&self, response: serde_json::Value) {
        *self.state.response.lock().unwrap() = Some(response);
    }

    pub fn fail_on(&self, node_id: &str, error: ActionError) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(node_id.to_string(), error);
    }

    pub fn heal(&self, node_id: &str) {
        self.state.failures.lock().unwrap().remove(node_id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.state.shutdowns.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn gate(&self) -> &Gate {
        self.state.gate.as_ref().expect("stub is not gated")
    }

    pub fn factory(&self) -> Arc<dyn ExecutorFactory> {
        Arc::new(StubFactory(self.clone()))
    }
}

#[async_trait]
impl ActionExecutor for StubExecutor {
    fn node_type(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, ctx: ActionContext) -> Result<ActionOutput, ActionError> {
        self.state.calls.lock().unwrap().push(ctx.node_id.clone());

        if let Some(gate) = &self.state.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let failure = self.state.failures.lock().unwrap().get(&ctx.node_id).cloned();
        if let Some(error) = failure {
            return Err(error);
        }

        let response = self.state.response.lock().unwrap().clone();
        Ok(match response {
            Some(body) => ActionOutput::new().with_response(200, body),
            None => ActionOutput::new(),
        })
    }

    async fn shutdown(&self) {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubFactory(StubExecutor);

impl ExecutorFactory for StubFactory {
    fn create(&self) -> Result<Box<dyn ActionExecutor>, ActionError> {
        self.0.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.0.clone()))
    }

    fn node_type(&self) -> &str {
        &self.0.kind
    }
}

/// Factory whose executor can never be opened
pub struct BrokenFactory {
    pub kind: String,
    pub error: ActionError,
}

impl ExecutorFactory for BrokenFactory {
    fn create(&self) -> Result<Box<dyn ActionExecutor>, ActionError> {
        Err(self.error.clone())
    }

    fn node_type(&self) -> &str {
        &self.kind
    }
}
