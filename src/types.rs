//! Domain types exchanged with the SysML v2 project/element store
//!
//! Field names follow the store's JSON-LD flavoured wire format (`@id`,
//! `@type`, camelCase). Unknown fields are kept so nothing the store
//! returns is lost when results are echoed back to MCP clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A SysML v2 project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(rename = "@type", default = "default_project_type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub alias: Vec<String>,

    /// Creation timestamp as reported by the store
    #[serde(default)]
    pub created: String,

    #[serde(
        rename = "defaultBranch",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_branch: Option<Branch>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Create a project with only identity, name and description set
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_project_type(),
            name: name.into(),
            description: description.into(),
            alias: Vec::new(),
            created: String::new(),
            default_branch: None,
            extra: Map::new(),
        }
    }
}

/// Branch reference embedded in a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(rename = "@type", default = "default_branch_type")]
    pub kind: String,

    #[serde(default)]
    pub name: String,
}

/// A model element inside a project (optionally pinned to a commit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(rename = "@type", default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "qualifiedName", default)]
    pub qualified_name: String,

    #[serde(rename = "elementId", default)]
    pub element_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            element_id: id.clone(),
            qualified_name: name.clone(),
            id,
            kind: kind.into(),
            name,
            extra: Map::new(),
        }
    }
}

/// Body sent to the store when creating a project
#[derive(Debug, Clone, Serialize)]
pub struct CreateProjectRequest<'a> {
    #[serde(rename = "@type")]
    pub kind: &'static str,
    pub name: &'a str,
    pub description: &'a str,
}

impl<'a> CreateProjectRequest<'a> {
    pub fn new(name: &'a str, description: &'a str) -> Self {
        Self {
            kind: "Project",
            name,
            description,
        }
    }
}

fn default_project_type() -> String {
    "Project".to_string()
}

fn default_branch_type() -> String {
    "Branch".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_wire_names() {
        let project: Project = serde_json::from_value(json!({
            "@id": "p-1",
            "@type": "Project",
            "name": "Drone",
            "description": "Quadcopter model",
            "defaultBranch": {"@id": "b-1", "name": "main"},
            "resourceIdentifier": "urn:p-1"
        }))
        .unwrap();

        assert_eq!(project.id, "p-1");
        assert_eq!(project.default_branch.as_ref().unwrap().kind, "Branch");
        assert_eq!(project.extra["resourceIdentifier"], "urn:p-1");

        let back = serde_json::to_value(&project).unwrap();
        assert_eq!(back["@id"], "p-1");
        assert_eq!(back["defaultBranch"]["@id"], "b-1");
        assert_eq!(back["resourceIdentifier"], "urn:p-1");
    }

    #[test]
    fn test_element_defaults_missing_fields() {
        let element: Element = serde_json::from_value(json!({"@id": "e-1"})).unwrap();
        assert_eq!(element.id, "e-1");
        assert!(element.name.is_empty());
        assert!(element.qualified_name.is_empty());
    }

    #[test]
    fn test_create_request_body() {
        let body = serde_json::to_value(CreateProjectRequest::new("Drone", "Quadcopter")).unwrap();
        assert_eq!(
            body,
            json!({"@type": "Project", "name": "Drone", "description": "Quadcopter"})
        );
    }
}
