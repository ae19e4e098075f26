// crates/relaynodes/tests/scenario_test.rs
//
// End-to-end runs through the engine with the standard executors.

use async_trait::async_trait;
use relaycore::{ExecutionError, NodeSpec, Workflow, WorkflowStatus};
use relaynodes::{
    ApiExecutorFactory, EmailExecutorFactory, MailError, MailTransport, OutgoingMail,
};
use relayruntime::{ExecutorRegistry, InMemoryWorkflowStore, WorkflowEngine, WorkflowStore};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StubMail {
    failure: Option<&'static str>,
    sent: AtomicUsize,
}

impl StubMail {
    fn ok() -> Arc<Self> {
        Arc::new(Self { failure: None, sent: AtomicUsize::new(0) })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self { failure: Some(message), sent: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl MailTransport for StubMail {
    async fn send(&self, _mail: OutgoingMail) -> Result<(), MailError> {
        match self.failure {
            Some(message) => Err(MailError(message.to_string())),
            None => {
                self.sent.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

fn engine(mail: Arc<StubMail>) -> (WorkflowEngine, Arc<InMemoryWorkflowStore>) {
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(ApiExecutorFactory::new()));
    registry.register(Arc::new(EmailExecutorFactory::with_transport(mail)));
    let store = Arc::new(InMemoryWorkflowStore::new());
    (WorkflowEngine::new(Arc::new(registry), store.clone()), store)
}

#[tokio::test]
async fn test_single_api_node_passes_and_records_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (engine, store) = engine(StubMail::ok());
    let mut workflow = Workflow::new("ping");
    workflow.add_node(
        NodeSpec::action("call", "api").with_field("Endpoint", format!("{}/ok", server.uri())),
    );
    let id = store.insert(workflow).await.unwrap().workflow_id;

    let result = engine.execute_workflow(&id).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Passed);
    assert!(result.error.is_none());
    assert_eq!(result.results["call"].response, json!({"ok": true}));
    assert_eq!(result.results["call"].status, Some(200));
}

#[tokio::test]
async fn test_single_email_node_transport_failure() {
    let (engine, store) = engine(StubMail::failing("SMTP timeout"));
    let mut workflow = Workflow::new("notify");
    workflow.add_node(
        NodeSpec::action("mail", "email")
            .with_field("To", "ops@example.test")
            .with_field("Subject", "Report")
            .with_field("Body", "Attached"),
    );
    let id = store.insert(workflow).await.unwrap().workflow_id;

    let err = engine.execute_workflow(&id).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Failed { .. }));

    let persisted = store.find_by_workflow_id(&id).await.unwrap().unwrap();
    assert_eq!(persisted.status, WorkflowStatus::Failed);
    assert_eq!(persisted.error.as_deref(), Some("EmailError: SMTP timeout"));
}

#[tokio::test]
async fn test_invalid_body_fails_run_without_request() {
    let server = MockServer::start().await;
    let mail = StubMail::ok();
    let (engine, store) = engine(mail.clone());

    let mut workflow = Workflow::new("bad body");
    workflow.add_node(
        NodeSpec::action("call", "api")
            .with_field("Endpoint", format!("{}/orders", server.uri()))
            .with_field("Method", "POST")
            .with_field("Body", "{\"qty\": }"),
    );
    workflow.add_node(NodeSpec::action("mail", "email").with_field("To", "ops@example.test"));
    let id = store.insert(workflow).await.unwrap().workflow_id;

    assert!(engine.execute_workflow(&id).await.is_err());

    let persisted = store.find_by_workflow_id(&id).await.unwrap().unwrap();
    assert_eq!(persisted.status, WorkflowStatus::Failed);
    let error = persisted.error.unwrap();
    assert!(error.starts_with("ParseError: invalid JSON in Body: expected value"), "{}", error);
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(mail.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_api_then_email_chain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/builds"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"queued": 1})))
        .mount(&server)
        .await;

    let mail = StubMail::ok();
    let (engine, store) = engine(mail.clone());
    let mut workflow = Workflow::new("build and notify");
    workflow.add_node(
        NodeSpec::action("trigger", "api")
            .with_field("Endpoint", format!("{}/builds", server.uri()))
            .with_field("Method", "post"),
    );
    workflow.add_node(NodeSpec::new("note", "annotation"));
    workflow.add_node(NodeSpec::action("mail", "email").with_field("To", "dev@example.test"));
    let id = store.insert(workflow).await.unwrap().workflow_id;

    let result = engine.execute_workflow(&id).await.unwrap();

    assert_eq!(result.status, WorkflowStatus::Passed);
    assert_eq!(result.results["trigger"].status, Some(202));
    assert_eq!(mail.sent.load(Ordering::SeqCst), 1);
}
