use actix_cors::Cors;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use chrono::Utc;
use relaycore::{
    generate_workflow_id, Edge, ExecutionError, NodeSpec, StoreError, Workflow, WorkflowStatus,
};
use relaynodes::SmtpConfig;
use relayruntime::{
    ExecutorRegistry, InMemoryWorkflowStore, JsonFileStore, RuntimeConfig, WorkflowEngine,
    WorkflowStore,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Fresh ids tried before giving up on a create request
const MAX_ID_ATTEMPTS: usize = 8;

/// Application state shared across handlers
struct AppState {
    engine: Arc<WorkflowEngine>,
}

impl AppState {
    fn store(&self) -> &Arc<dyn WorkflowStore> {
        self.engine.store()
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

/// Request body for workflow creation
#[derive(Debug, Deserialize)]
struct CreateWorkflowRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    nodes: Vec<NodeSpec>,
    #[serde(default)]
    edges: Vec<Edge>,
}

fn message(text: &str) -> serde_json::Value {
    serde_json::json!({ "message": text })
}

fn server_error(text: &str, err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "message": text,
        "error": err.to_string(),
    }))
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "relay"
    }))
}

/// List workflows, optionally filtered by name or id
#[get("/api/workflows")]
async fn list_workflows(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ActixResult<impl Responder> {
    match data.store().list(query.search.as_deref()).await {
        Ok(workflows) => Ok(HttpResponse::Ok().json(workflows)),
        Err(e) => {
            error!("Error fetching workflows: {}", e);
            Ok(server_error("Error fetching workflows", e))
        }
    }
}

/// Create a new workflow in `pending` state
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    req: web::Json<CreateWorkflowRequest>,
) -> ActixResult<impl Responder> {
    let req = req.into_inner();
    let now = Utc::now();

    for _ in 0..MAX_ID_ATTEMPTS {
        let workflow = Workflow {
            workflow_id: generate_workflow_id(),
            name: req.name.clone(),
            description: req.description.clone(),
            nodes: req.nodes.clone(),
            edges: req.edges.clone(),
            status: WorkflowStatus::Pending,
            error: None,
            results: BTreeMap::new(),
            created_on: now,
            last_edited_on: now,
            last_executed_on: None,
        };

        match data.store().insert(workflow).await {
            Ok(workflow) => {
                info!("Created workflow: {} ({})", workflow.name, workflow.workflow_id);
                return Ok(HttpResponse::Created().json(workflow));
            }
            Err(StoreError::Duplicate(id)) => {
                warn!("Workflow id {} already taken, retrying", id);
            }
            Err(e) => {
                error!("Error creating workflow: {}", e);
                return Ok(server_error("Error creating workflow", e));
            }
        }
    }

    Ok(server_error(
        "Error creating workflow",
        "could not allocate a unique workflow id",
    ))
}

/// Get a specific workflow
#[get("/api/workflows/{workflow_id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.store().find_by_workflow_id(&workflow_id).await {
        Ok(Some(workflow)) => Ok(HttpResponse::Ok().json(workflow)),
        Ok(None) => Ok(HttpResponse::NotFound().json(message("Workflow not found"))),
        Err(e) => Ok(server_error("Error fetching workflow", e)),
    }
}

/// Execute a workflow and wait for it to finish
#[post("/api/workflows/{workflow_id}/execute")]
async fn execute_workflow(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    info!("Executing workflow: {}", workflow_id);

    match data.engine.execute_workflow(&workflow_id).await {
        Ok(workflow) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Workflow executed successfully",
            "workflow": workflow,
        }))),
        Err(ExecutionError::NotFound(_)) => {
            Ok(HttpResponse::NotFound().json(message("Workflow not found")))
        }
        Err(e @ ExecutionError::Conflict(_)) => Ok(HttpResponse::Conflict().json(
            serde_json::json!({ "message": "Workflow is already running", "error": e.to_string() }),
        )),
        Err(ExecutionError::Failed { node_id, error }) => {
            warn!("Workflow {} failed at node {}: {}", workflow_id, node_id, error);
            Ok(server_error("Workflow execution failed", error.message()))
        }
        Err(e) => {
            error!("Error executing workflow {}: {}", workflow_id, e);
            Ok(server_error("Error executing workflow", e))
        }
    }
}

/// List available action kinds
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.engine.registry();

    let nodes: Vec<_> = registry
        .list_node_types()
        .iter()
        .map(|node_type| {
            let metadata = registry.get_metadata(node_type);
            serde_json::json!({
                "type": node_type,
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

async fn open_store() -> anyhow::Result<Arc<dyn WorkflowStore>> {
    match std::env::var("RELAY_DATA_FILE") {
        Ok(path) if !path.trim().is_empty() => Ok(Arc::new(JsonFileStore::open(path).await?)),
        _ => {
            info!("RELAY_DATA_FILE not set, keeping workflows in memory");
            Ok(Arc::new(InMemoryWorkflowStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting relay server");

    let mut registry = ExecutorRegistry::new();
    relaynodes::register_all(&mut registry, SmtpConfig::from_env());

    let engine = WorkflowEngine::with_config(
        Arc::new(registry),
        open_store().await?,
        RuntimeConfig::from_env(),
    );

    let app_state = web::Data::new(AppState {
        engine: Arc::new(engine),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("Server listening on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_workflows)
            .service(create_workflow)
            .service(get_workflow)
            .service(execute_workflow)
            .service(list_node_types)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
