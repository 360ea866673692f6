//! In-memory project/element store
//!
//! Backs `--backend memory` for offline runs and demos, and gives tests a
//! deterministic store without a network.

use super::ModelBackend;
use crate::error::Result;
use crate::types::{Element, Project};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Elements keyed by project, then by commit (`None` = latest)
type ElementTable = HashMap<String, HashMap<Option<String>, Vec<Element>>>;

/// Lock-protected in-memory store
#[derive(Default)]
pub struct InMemoryBackend {
    projects: RwLock<Vec<Project>>,
    elements: RwLock<ElementTable>,
    requests: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.get_mut().push(project);
        self
    }

    /// Seed an element for a project, optionally scoped to a commit
    pub fn with_element(
        mut self,
        project_id: &str,
        commit_id: Option<&str>,
        element: Element,
    ) -> Self {
        self.elements
            .get_mut()
            .entry(project_id.to_string())
            .or_default()
            .entry(commit_id.map(str::to_string))
            .or_default()
            .push(element);
        self
    }

    /// A small sample model used by `--backend memory`
    pub fn sample() -> Self {
        let project_id = "demo-drone";
        Self::new()
            .with_project(Project::new(
                project_id,
                "Drone System",
                "Sample quadcopter architecture model",
            ))
            .with_element(
                project_id,
                None,
                Element::new("el-airframe", "PartDefinition", "Airframe"),
            )
            .with_element(
                project_id,
                None,
                Element::new("el-propulsion", "PartDefinition", "PropulsionUnit"),
            )
            .with_element(
                project_id,
                Some("commit-1"),
                Element::new("el-airframe", "PartDefinition", "Airframe"),
            )
    }

    /// Number of store operations served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    async fn project_exists(&self, project_id: &str) -> bool {
        self.projects.read().await.iter().any(|p| p.id == project_id)
    }
}

#[async_trait]
impl ModelBackend for InMemoryBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.record();
        Ok(self.projects.read().await.clone())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.record();
        let projects = self.projects.read().await;
        Ok(projects.iter().find(|p| p.id == project_id).cloned())
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        self.record();
        let mut project = Project::new(uuid::Uuid::new_v4().to_string(), name, description);
        project.created = Utc::now().to_rfc3339();
        self.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        self.record();
        let mut projects = self.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != project_id);
        let deleted = projects.len() != before;
        drop(projects);

        if deleted {
            self.elements.write().await.remove(project_id);
        }
        Ok(deleted)
    }

    async fn list_elements(
        &self,
        project_id: &str,
        commit_id: Option<&str>,
    ) -> Result<Vec<Element>> {
        self.record();
        let elements = self.elements.read().await;
        Ok(elements
            .get(project_id)
            .and_then(|commits| commits.get(&commit_id.map(str::to_string)))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_element(
        &self,
        project_id: &str,
        element_id: &str,
        commit_id: Option<&str>,
    ) -> Result<Option<Element>> {
        self.record();
        if !self.project_exists(project_id).await {
            return Ok(None);
        }
        let elements = self.elements.read().await;
        Ok(elements
            .get(project_id)
            .and_then(|commits| commits.get(&commit_id.map(str::to_string)))
            .and_then(|list| list.iter().find(|e| e.id == element_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_store() {
        let backend = InMemoryBackend::sample();
        let projects = tokio_test::block_on(backend.list_projects()).unwrap();
        assert_eq!(projects.len(), 1);

        let latest = tokio_test::block_on(backend.list_elements("demo-drone", None)).unwrap();
        assert_eq!(latest.len(), 2);

        let pinned =
            tokio_test::block_on(backend.list_elements("demo-drone", Some("commit-1"))).unwrap();
        assert_eq!(pinned.len(), 1);
        assert_eq!(backend.request_count(), 3);
    }

    #[tokio::test]
    async fn test_create_then_delete() {
        let backend = InMemoryBackend::new();
        let project = backend.create_project("Rover", "Mars rover").await.unwrap();
        assert!(!project.id.is_empty());
        assert!(!project.created.is_empty());

        assert_eq!(backend.get_project(&project.id).await.unwrap(), Some(project.clone()));
        assert!(backend.delete_project(&project.id).await.unwrap());
        assert!(!backend.delete_project(&project.id).await.unwrap());
        assert!(backend.get_project(&project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_element_absent_cases() {
        let backend = InMemoryBackend::sample();
        assert!(backend
            .get_element("demo-drone", "el-airframe", None)
            .await
            .unwrap()
            .is_some());
        assert!(backend
            .get_element("demo-drone", "el-missing", None)
            .await
            .unwrap()
            .is_none());
        assert!(backend
            .get_element("nope", "el-airframe", None)
            .await
            .unwrap()
            .is_none());
        assert!(backend
            .get_element("demo-drone", "el-propulsion", Some("commit-1"))
            .await
            .unwrap()
            .is_none());
    }
}
