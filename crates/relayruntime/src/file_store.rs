use crate::store::{search_sorted, WorkflowStore};
use async_trait::async_trait;
use relaycore::{StoreError, Workflow, WorkflowId};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Store that keeps every workflow in one JSON document on disk
///
/// The file holds a JSON array of workflows. Each write rewrites the whole
/// file through a temporary sibling and a rename. Memory only changes once
/// the file has been written.
pub struct JsonFileStore {
    path: PathBuf,
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let workflows = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<Workflow> = serde_json::from_slice(&bytes)?;
                list.into_iter()
                    .map(|w| (w.workflow_id.clone(), w))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Opened workflow store {} ({} workflows)", path.display(), workflows.len());

        Ok(Self {
            path,
            workflows: RwLock::new(workflows),
        })
    }

    async fn persist(&self, workflows: &HashMap<WorkflowId, Workflow>) -> Result<(), StoreError> {
        let mut list: Vec<&Workflow> = workflows.values().collect();
        list.sort_by(|a, b| a.created_on.cmp(&b.created_on));
        let json = serde_json::to_vec_pretty(&list)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for JsonFileStore {
    async fn find_by_workflow_id(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(workflow_id).cloned())
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().await;
        let mut next = workflows.clone();
        next.insert(workflow.workflow_id.clone(), workflow.clone());
        self.persist(&next).await?;
        *workflows = next;
        Ok(())
    }

    async fn insert(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&workflow.workflow_id) {
            return Err(StoreError::Duplicate(workflow.workflow_id));
        }
        let mut next = workflows.clone();
        next.insert(workflow.workflow_id.clone(), workflow.clone());
        self.persist(&next).await?;
        *workflows = next;
        Ok(workflow)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(search_sorted(workflows.values(), search))
    }
}
