//! Backend adapters for the remote project/element store
//!
//! Every MCP tool translates into exactly one call on [`ModelBackend`].
//! "Not found" is reported as an absent value (or `false` for deletes),
//! never as an error; errors are reserved for transport and store failures.

pub mod http;
pub mod memory;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;
use crate::types::{Element, Project};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use http::HttpModelBackend;
pub use memory::InMemoryBackend;

/// Project/element store operations consumed by the tool handlers
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// List all projects
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Fetch one project, `None` when the store does not know it
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    /// Create a project and return it as stored
    async fn create_project(&self, name: &str, description: &str) -> Result<Project>;

    /// Delete a project, `false` when nothing was deleted
    async fn delete_project(&self, project_id: &str) -> Result<bool>;

    /// List elements of a project, optionally at a specific commit
    async fn list_elements(&self, project_id: &str, commit_id: Option<&str>)
        -> Result<Vec<Element>>;

    /// Fetch one element, `None` when the project or element is unknown
    async fn get_element(
        &self,
        project_id: &str,
        element_id: &str,
        commit_id: Option<&str>,
    ) -> Result<Option<Element>>;
}

/// Build the backend selected by configuration
pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn ModelBackend>> {
    match config.kind {
        BackendKind::Http => {
            let backend = HttpModelBackend::new(
                &config.base_url,
                Duration::from_secs(config.connect_timeout_secs),
            )?;
            info!("Using SysML v2 API at {}", backend.base_url());
            Ok(Arc::new(backend))
        }
        BackendKind::Memory => {
            info!("Using in-memory sample model store");
            Ok(Arc::new(InMemoryBackend::sample()))
        }
    }
}
