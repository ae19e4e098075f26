// crates/relaycli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relaycore::{ExecutionError, ExecutionEvent, NodeEvent, NodeSpec, Workflow};
use relaynodes::SmtpConfig;
use relayruntime::{
    ExecutorRegistry, InMemoryWorkflowStore, RuntimeConfig, Topology, WorkflowEngine,
    WorkflowStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Write the updated workflow back to the file
        #[arg(short, long)]
        write: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node kinds
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn standard_registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    relaynodes::register_all(&mut registry, SmtpConfig::from_env());
    registry
}

fn load_workflow(file: &Path) -> Result<Workflow> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", file.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, write, verbose } => {
            init_tracing(verbose);
            run_workflow(file, write).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, write: bool) -> Result<()> {
    println!("Loading workflow from: {}", file.display());

    let workflow = load_workflow(&file)?;
    let workflow_id = workflow.workflow_id.clone();

    println!("Workflow: {} ({})", workflow.name, workflow_id);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Executable: {}", workflow.executable_nodes().count());
    println!();

    let store = Arc::new(InMemoryWorkflowStore::new());
    store.insert(workflow).await?;

    let engine = WorkflowEngine::with_config(
        Arc::new(standard_registry()),
        store.clone(),
        RuntimeConfig::from_env(),
    );

    let mut events = engine.subscribe_events();

    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { .. } => {
                    println!("> Run started");
                }
                ExecutionEvent::NodeDispatched { node_id, node_type, .. } => {
                    println!("  - Dispatching node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeSkipped { node_id, node_type, .. } => {
                    println!(
                        "  - Skipping node: {} ({})",
                        node_id,
                        node_type.as_deref().unwrap_or("no action")
                    );
                }
                ExecutionEvent::NodeCompleted { node_id, duration_ms, .. } => {
                    println!("  + Node {} completed in {}ms", node_id, duration_ms);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  x Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
                    NodeEvent::Info { message } => println!("     [{}] {}", node_id, message),
                    NodeEvent::Warning { message } => {
                        println!("     [{}] warning: {}", node_id, message)
                    }
                },
                ExecutionEvent::RunCompleted { status, duration_ms, .. } => {
                    println!("> Run {} in {}ms", status, duration_ms);
                    break;
                }
            }
        }
    });

    let result = engine.execute_workflow(&workflow_id).await;

    // Only finished runs emit RunCompleted.
    match &result {
        Ok(_) | Err(ExecutionError::Failed { .. }) => {
            let _ = tokio::time::timeout(Duration::from_millis(500), event_task).await;
        }
        Err(_) => event_task.abort(),
    }

    let updated = store
        .find_by_workflow_id(&workflow_id)
        .await?
        .context("workflow disappeared from the store")?;

    println!();
    println!("Execution Summary:");
    println!("   Status: {}", updated.status);
    if let Some(error) = &updated.error {
        println!("   Error: {}", error);
    }
    for (node_id, node_result) in &updated.results {
        println!("   Response from {}: {}", node_id, node_result.response);
    }

    if write {
        std::fs::write(&file, serde_json::to_string_pretty(&updated)?)?;
        println!();
        println!("Saved updated workflow to {}", file.display());
    }

    result.map(|_| ()).map_err(Into::into)
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("Validating workflow: {}", file.display());

    let workflow = load_workflow(&file)?;
    let topology = Topology::validate(&workflow)?;
    let registry = standard_registry();

    let (runnable, skipped): (Vec<&NodeSpec>, Vec<&NodeSpec>) = workflow
        .nodes
        .iter()
        .partition(|n| n.action_kind().map_or(false, |kind| registry.contains(kind)));

    println!("Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", topology.node_count());
    println!("   Edges: {}", topology.edge_count());
    println!("   Runnable nodes: {}", runnable.len());
    for node in skipped {
        println!(
            "   Will skip {} ({} / {})",
            node.id,
            node.node_type,
            node.data.node_type.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn list_nodes() {
    println!("Available Node Kinds:");
    println!();

    let registry = standard_registry();

    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  * {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  * {}", node_type);
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut workflow = Workflow::new("Example API Workflow")
        .with_description("Fetches data from an API and emails a notification");

    let fetch = workflow.add_node(
        NodeSpec::action("1", "api")
            .with_label("Fetch Data")
            .with_field("Endpoint", "https://api.github.com/zen")
            .with_field("Method", "GET")
            .with_field("Headers", r#"{"User-Agent": "relay"}"#)
            .with_position(100.0, 100.0),
    );
    let notify = workflow.add_node(
        NodeSpec::action("2", "email")
            .with_label("Notify")
            .with_field("To", "ops@example.com")
            .with_field("Subject", "Workflow finished")
            .with_field("Body", "The API call completed.")
            .with_position(300.0, 100.0),
    );

    workflow.connect(fetch, notify);

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)?;

    println!("Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  relay run --file {}", output.display());

    Ok(())
}
