//! HTTP adapter for the SysML v2 REST API

use super::ModelBackend;
use crate::error::{Result, SysmlMcpError};
use crate::types::{CreateProjectRequest, Element, Project};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest slice of an error body kept in error messages
const MAX_ERROR_BODY: usize = 200;

/// Backend that talks to a SysML v2 API server over HTTP
pub struct HttpModelBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpModelBackend {
    /// Create a backend rooted at `base_url` (e.g. `https://sysml.example.com`)
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SysmlMcpError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SysmlMcpError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("sysml-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Base URL every request is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SysmlMcpError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn element_path<'a>(project_id: &'a str, commit_id: Option<&'a str>) -> Vec<&'a str> {
        match commit_id {
            Some(commit_id) => vec!["projects", project_id, "commits", commit_id, "elements"],
            None => vec!["projects", project_id, "elements"],
        }
    }

    /// GET a JSON document; `Ok(None)` on 404
    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(url, response).await.map(Some)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: Url, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!("Backend returned {} for {}", status, url);
        return Err(SysmlMcpError::BackendStatus {
            status: status.as_u16(),
            url: url.to_string(),
            body: truncate(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| SysmlMcpError::BackendDecode(format!("{}: {}", url, e)))
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = self.url(&["projects"])?;
        self.get(url).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let url = self.url(&["projects", project_id])?;
        self.get_optional(url).await
    }

    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let url = self.url(&["projects"])?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .json(&CreateProjectRequest::new(name, description))
            .send()
            .await?;
        decode(url, response).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        let url = self.url(&["projects", project_id])?;
        debug!("DELETE {}", url);
        let response = self.client.delete(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SysmlMcpError::BackendStatus {
            status: status.as_u16(),
            url: url.to_string(),
            body: truncate(&body),
        })
    }

    async fn list_elements(
        &self,
        project_id: &str,
        commit_id: Option<&str>,
    ) -> Result<Vec<Element>> {
        let url = self.url(&Self::element_path(project_id, commit_id))?;
        self.get(url).await
    }

    async fn get_element(
        &self,
        project_id: &str,
        element_id: &str,
        commit_id: Option<&str>,
    ) -> Result<Option<Element>> {
        let mut path = Self::element_path(project_id, commit_id);
        path.push(element_id);
        let url = self.url(&path)?;
        self.get_optional(url).await
    }
}
