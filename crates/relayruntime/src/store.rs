use async_trait::async_trait;
use relaycore::{StoreError, Workflow, WorkflowId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence collaborator for workflow documents
///
/// Every write replaces the whole document.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn find_by_workflow_id(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError>;

    /// Insert or replace
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Insert a new workflow, rejecting an id that is already taken
    async fn insert(&self, workflow: Workflow) -> Result<Workflow, StoreError>;

    /// Workflows whose name or id contains `search` (case-insensitive),
    /// most recently edited first
    async fn list(&self, search: Option<&str>) -> Result<Vec<Workflow>, StoreError>;
}

/// Store backed by a map in memory
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn find_by_workflow_id(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(workflow_id).cloned())
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(workflow.workflow_id.clone(), workflow.clone());
        Ok(())
    }

    async fn insert(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        let mut workflows = self.workflows.write().await;
        if workflows.contains_key(&workflow.workflow_id) {
            return Err(StoreError::Duplicate(workflow.workflow_id));
        }
        workflows.insert(workflow.workflow_id.clone(), workflow.clone());
        Ok(workflow)
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Workflow>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(search_sorted(workflows.values(), search))
    }
}

pub(crate) fn search_sorted<'a>(
    workflows: impl Iterator<Item = &'a Workflow>,
    search: Option<&str>,
) -> Vec<Workflow> {
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut found: Vec<Workflow> = workflows
        .filter(|w| match &needle {
            Some(needle) => {
                w.name.to_lowercase().contains(needle)
                    || w.workflow_id.to_lowercase().contains(needle)
            }
            None => true,
        })
        .cloned()
        .collect();

    found.sort_by(|a, b| b.last_edited_on.cmp(&a.last_edited_on));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn workflow(id: &str, name: &str, edited_mins_ago: i64) -> Workflow {
        let mut w = Workflow::new(name).with_id(id);
        w.last_edited_on = Utc::now() - Duration::minutes(edited_mins_ago);
        w
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = InMemoryWorkflowStore::new();
        store.insert(workflow("#1", "a", 0)).await.unwrap();

        let err = store.insert(workflow("#1", "b", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "#1"));
    }

    #[tokio::test]
    async fn test_list_searches_name_and_id() {
        let store = InMemoryWorkflowStore::new();
        store.insert(workflow("#1000", "Daily Report", 5)).await.unwrap();
        store.insert(workflow("#2000", "Alerts", 1)).await.unwrap();
        store.insert(workflow("#3000", "weekly REPORT", 3)).await.unwrap();

        let all = store.list(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|w| w.workflow_id.as_str()).collect();
        assert_eq!(ids, vec!["#2000", "#3000", "#1000"]);

        let reports = store.list(Some("report")).await.unwrap();
        let ids: Vec<_> = reports.iter().map(|w| w.workflow_id.as_str()).collect();
        assert_eq!(ids, vec!["#3000", "#1000"]);

        let by_id = store.list(Some("#20")).await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].name, "Alerts");
    }

    #[tokio::test]
    async fn test_save_replaces_document() {
        let store = InMemoryWorkflowStore::new();
        let mut w = store.insert(workflow("#1", "a", 0)).await.unwrap();
        w.name = "renamed".to_string();
        store.save(&w).await.unwrap();

        let loaded = store.find_by_workflow_id("#1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "renamed");
        assert!(store.find_by_workflow_id("#2").await.unwrap().is_none());
    }
}
