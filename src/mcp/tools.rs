//! MCP tool registry and invoker
//!
//! Provides the six project/element tools:
//! - Projects: list_projects, get_project, create_project, delete_project
//! - Elements: list_elements, get_element
//!
//! Each tool declares its parameters once; the JSON input schema published by
//! `tools/list` and the argument validation done before a handler runs are
//! both derived from that declaration. Failures never escape as protocol
//! errors: they come back as a [`ToolResult`] with `isError` set.

use crate::backend::ModelBackend;
use crate::error::{Result, SysmlMcpError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tool schema definition, as published by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (e.g., "get_project")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Primitive type a parameter is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
}

impl ParamKind {
    fn schema_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
        }
    }

    /// Coerce a supplied value, `None` when it can not be represented
    fn coerce(self, value: &Value) -> Option<String> {
        match self {
            ParamKind::String => match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
        }
    }
}

/// One declared tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

/// Backend operation a tool maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOp {
    ListProjects,
    GetProject,
    CreateProject,
    DeleteProject,
    ListElements,
    GetElement,
}

impl ToolOp {
    fn failure_prefix(self) -> &'static str {
        match self {
            ToolOp::ListProjects => "Failed to list projects",
            ToolOp::GetProject => "Failed to get project",
            ToolOp::CreateProject => "Failed to create project",
            ToolOp::DeleteProject => "Failed to delete project",
            ToolOp::ListElements => "Failed to list elements",
            ToolOp::GetElement => "Failed to get element",
        }
    }

    /// Issue the single backend call for this operation and render the outcome
    async fn run(self, backend: &dyn ModelBackend, args: &ToolArgs) -> ToolResult {
        let outcome = match self {
            ToolOp::ListProjects => backend.list_projects().await.map(|projects| {
                ToolResult::text(format!(
                    "Found {} projects:\n{}",
                    projects.len(),
                    pretty(&projects)
                ))
            }),
            ToolOp::GetProject => {
                let project_id = args.required("projectId");
                backend.get_project(project_id).await.map(|project| match project {
                    Some(project) => {
                        ToolResult::text(format!("Project details:\n{}", pretty(&project)))
                    }
                    None => ToolResult::error(format!("Project not found: {}", project_id)),
                })
            }
            ToolOp::CreateProject => backend
                .create_project(args.required("name"), args.required("description"))
                .await
                .map(|project| {
                    ToolResult::text(format!(
                        "Project created successfully:\n{}",
                        pretty(&project)
                    ))
                }),
            ToolOp::DeleteProject => {
                let project_id = args.required("projectId");
                backend.delete_project(project_id).await.map(|deleted| {
                    if deleted {
                        ToolResult::text(format!("Project {} deleted successfully", project_id))
                    } else {
                        ToolResult::error(format!(
                            "Failed to delete project {}: project not found or not deletable",
                            project_id
                        ))
                    }
                })
            }
            ToolOp::ListElements => {
                let project_id = args.required("projectId");
                let commit_id = args.optional("commitId");
                backend
                    .list_elements(project_id, commit_id)
                    .await
                    .map(|elements| {
                        let scope = match commit_id {
                            Some(commit_id) => format!(" at commit {}", commit_id),
                            None => String::new(),
                        };
                        ToolResult::text(format!(
                            "Found {} elements in project {}{}:\n{}",
                            elements.len(),
                            project_id,
                            scope,
                            pretty(&elements)
                        ))
                    })
            }
            ToolOp::GetElement => {
                let project_id = args.required("projectId");
                let element_id = args.required("elementId");
                backend
                    .get_element(project_id, element_id, args.optional("commitId"))
                    .await
                    .map(|element| match element {
                        Some(element) => {
                            ToolResult::text(format!("Element details:\n{}", pretty(&element)))
                        }
                        None => ToolResult::error(format!(
                            "Element not found: {} in project {}",
                            element_id, project_id
                        )),
                    })
            }
        };

        outcome.unwrap_or_else(|e| {
            warn!("{}: {}", self.failure_prefix(), e);
            ToolResult::error(format!("{}: {}", self.failure_prefix(), e))
        })
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

/// A tool as held by the registry
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    definition: ToolDefinition,
    params: Vec<ParamSpec>,
    op: ToolOp,
}

impl RegisteredTool {
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn op(&self) -> ToolOp {
        self.op
    }
}

/// Fluent declaration of a tool
pub struct ToolBuilder {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, name: &'static str, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind: ParamKind::String,
            required: true,
            description,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind: ParamKind::String,
            required: false,
            description,
        });
        self
    }

    pub fn build(self, op: ToolOp) -> RegisteredTool {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({"type": p.kind.schema_type(), "description": p.description}),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        RegisteredTool {
            definition: ToolDefinition {
                name: self.name,
                description: self.description,
                input_schema: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            },
            params: self.params,
            op,
        }
    }
}

/// Immutable-after-startup catalog: ordered for listing, indexed for dispatch
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six project/element tools
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();

        registry.register(
            ToolBuilder::new("list_projects")
                .description("List all SysML v2 projects")
                .build(ToolOp::ListProjects),
        )?;
        registry.register(
            ToolBuilder::new("get_project")
                .description("Get details of a specific SysML v2 project")
                .required("projectId", "The ID of the project to retrieve")
                .build(ToolOp::GetProject),
        )?;
        registry.register(
            ToolBuilder::new("create_project")
                .description("Create a new SysML v2 project")
                .required("name", "Name of the project")
                // A blank description is rejected like any other blank argument
                .required("description", "Description of the project")
                .build(ToolOp::CreateProject),
        )?;
        registry.register(
            ToolBuilder::new("delete_project")
                .description("Delete a SysML v2 project")
                .required("projectId", "The ID of the project to delete")
                .build(ToolOp::DeleteProject),
        )?;
        registry.register(
            ToolBuilder::new("list_elements")
                .description("List elements in a SysML v2 project")
                .required("projectId", "The ID of the project")
                .optional(
                    "commitId",
                    "Optional commit ID to get elements from specific commit",
                )
                .build(ToolOp::ListElements),
        )?;
        registry.register(
            ToolBuilder::new("get_element")
                .description("Get details of a specific element in a SysML v2 project")
                .required("projectId", "The ID of the project")
                .required("elementId", "The ID of the element")
                .optional(
                    "commitId",
                    "Optional commit ID to get element from specific commit",
                )
                .build(ToolOp::GetElement),
        )?;

        Ok(registry)
    }

    /// Add a tool; names must be unique
    pub fn register(&mut self, tool: RegisteredTool) -> Result<()> {
        let name = tool.definition.name.clone();
        if self.index.contains_key(&name) {
            return Err(SysmlMcpError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Arguments that passed validation, coerced to their declared kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: HashMap<&'static str, String>,
}

impl ToolArgs {
    /// Validate `arguments` against `params`, collecting every missing name
    pub fn validate(
        params: &[ParamSpec],
        arguments: &Map<String, Value>,
    ) -> std::result::Result<Self, Vec<&'static str>> {
        let mut values = HashMap::new();
        let mut missing = Vec::new();

        for param in params {
            match arguments.get(param.name).and_then(|v| param.kind.coerce(v)) {
                Some(value) => {
                    values.insert(param.name, value);
                }
                None if param.required => missing.push(param.name),
                None => {}
            }
        }

        if missing.is_empty() {
            Ok(Self { values })
        } else {
            Err(missing)
        }
    }

    /// A parameter validation guaranteed present; empty if called for an undeclared name
    fn required(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Content block inside a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Outcome of a `tools/call`, carried inside a successful JSON-RPC result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,

    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Text of the first block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            ContentBlock::Text { text } => text.as_str(),
        })
    }
}

fn missing_message(missing: &[&str]) -> String {
    if missing.len() == 1 {
        format!("Missing required parameter: {}", missing[0])
    } else {
        format!("Missing required parameters: {}", missing.join(", "))
    }
}

/// Tool handler that validates arguments and dispatches to the backend
pub struct ToolHandler {
    registry: ToolRegistry,
    backend: Arc<dyn ModelBackend>,
    call_timeout: Duration,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(
        registry: ToolRegistry,
        backend: Arc<dyn ModelBackend>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            call_timeout,
        }
    }

    /// Get list of all available tools
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Execute a tool call; every failure is folded into the result
    pub async fn execute(&self, tool_name: &str, arguments: &Map<String, Value>) -> ToolResult {
        let Some(tool) = self.registry.get(tool_name) else {
            debug!("Unknown tool requested: {}", tool_name);
            return ToolResult::error(format!("Unknown tool: {}", tool_name));
        };

        let args = match ToolArgs::validate(&tool.params, arguments) {
            Ok(args) => args,
            Err(missing) => {
                debug!("Rejected {} call, missing {:?}", tool_name, missing);
                return ToolResult::error(missing_message(&missing));
            }
        };

        info!("Executing tool: {}", tool_name);
        let op = tool.op;
        match tokio::time::timeout(self.call_timeout, op.run(self.backend.as_ref(), &args)).await
        {
            Ok(result) => result,
            Err(_) => {
                let err = SysmlMcpError::Timeout(self.call_timeout);
                warn!("{} ({}): {}", op.failure_prefix(), tool_name, err);
                ToolResult::error(format!("{}: {}", op.failure_prefix(), err))
            }
        }
    }
}
