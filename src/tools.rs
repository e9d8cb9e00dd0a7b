//! Tools exposed to agents.
//!
//! Every tool implements [`Tool`] and is held in a [`ToolRegistry`]. The
//! MCP bridge and the CLI both dispatch through the registry, so a tool
//! behaves identically whichever way it is called.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  ┌────────────────────┐ ┌─────────────┐  │
//! │  │ confluence_search  │ │ confluence_ │  │
//! │  │                    │ │ get_content │  │
//! │  └────────────────────┘ └─────────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!      ToolContext → ConfluenceGateway
//! ```
//!
//! Bad input is an error ([`ToolError::InvalidParams`]). A backend failure
//! is not: the tool returns a [`ToolOutput`] with `is_error` set, so the
//! agent sees the message and can decide what to do next.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::confluence::ConfluenceGateway;
use crate::cql::{merge_default_cql, validate_cql};
use crate::markdown::{html_to_markdown, truncate_chars};
use crate::models::{
    BodyRepresentation, ContentItem, ContentVersion, GetContentParams, SearchRequestParams,
    SearchResponsePage,
};

pub const SEARCH_TOOL_NAME: &str = "confluence_search";
pub const GET_CONTENT_TOOL_NAME: &str = "confluence_get_content";

const DEFAULT_SEARCH_LIMIT: u64 = 10;
const MIN_BODY_MAX_CHARS: usize = 100;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// Errors a tool reports instead of producing output.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The caller's arguments were rejected. Never retried.
    #[error("{0}")]
    InvalidParams(String),
}

/// What a tool hands back: human-readable text plus the same data as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    /// `Value::Null` when there is no structured payload.
    pub structured: Value,
    /// Set when the backend call failed. `text` then carries the message.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: String, structured: Value) -> Self {
        Self {
            text,
            structured,
            is_error: false,
        }
    }

    pub fn failure(text: String, structured: Value) -> Self {
        Self {
            text,
            structured,
            is_error: true,
        }
    }
}

/// A tool agents can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use confluence_mcp::tools::{Tool, ToolContext, ToolOutput};
///
/// pub struct WhoAmI;
///
/// #[async_trait]
/// impl Tool for WhoAmI {
///     fn name(&self) -> &str { "confluence_whoami" }
///     fn description(&self) -> &str { "Show which site this server talks to" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {}, "additionalProperties": false })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
///         let site = ctx.config().confluence.base_url.clone();
///         Ok(ToolOutput::success(site.clone(), json!({ "site": site })))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores, unique within a registry.
    fn name(&self) -> &str;

    /// Display title. Defaults to none.
    fn title(&self) -> Option<&str> {
        None
    }

    /// One-line description agents use to decide whether to call the tool.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments, `type: "object"`.
    fn parameters_schema(&self) -> Value;

    /// JSON Schema for [`ToolOutput::structured`] on success. Defaults to
    /// none, meaning the shape is not advertised.
    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Runs the tool. `params` is the raw argument object; tools validate
    /// it themselves with [`validate_params`].
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Everything a tool needs at call time. Cheap to clone.
#[derive(Clone)]
pub struct ToolContext {
    config: Arc<Config>,
    gateway: Arc<dyn ConfluenceGateway>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, gateway: Arc<dyn ConfluenceGateway>) -> Self {
        Self { config, gateway }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &dyn ConfluenceGateway {
        self.gateway.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Search
// ═══════════════════════════════════════════════════════════════════════

/// `confluence_search`: CQL search with the site's default condition
/// applied and the limit capped by config.
pub struct SearchTool;

#[derive(Debug, Serialize)]
struct SearchToolOutput {
    results: Vec<SearchHitOutput>,
    page: PageOutput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchHitOutput {
    id: String,
    title: String,
    #[serde(rename = "type")]
    content_type: Option<String>,
    url: Option<String>,
    space_key: Option<String>,
    space_name: Option<String>,
    excerpt: Option<String>,
    last_modified: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    total: u64,
    start: u32,
    limit: u32,
}

impl From<SearchResponsePage> for SearchToolOutput {
    fn from(page: SearchResponsePage) -> Self {
        Self {
            results: page
                .results
                .into_iter()
                .map(|r| SearchHitOutput {
                    id: r.id,
                    title: r.title,
                    content_type: r.content_type,
                    url: r.url,
                    space_key: r.space_key,
                    space_name: r.space_name,
                    excerpt: r.excerpt,
                    last_modified: r.last_modified,
                })
                .collect(),
            page: PageOutput {
                total: page.total,
                start: page.start,
                limit: page.limit,
            },
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn title(&self) -> Option<&str> {
        Some("Confluence Search")
    }

    fn description(&self) -> &str {
        "Search Confluence contents with CQL and return minimal normalized results."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cql": {
                    "type": "string",
                    "description": "CQL query, e.g. `type = page AND text ~ \"deploy\" ORDER BY lastmodified DESC`"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_SEARCH_LIMIT,
                    "description": "Max results. Capped by the server's configured maximum."
                },
                "start": {
                    "type": "integer",
                    "minimum": 0,
                    "default": 0,
                    "description": "Offset of the first result"
                },
                "asMarkdown": {
                    "type": "boolean",
                    "default": true,
                    "description": "If true, the text output is Markdown; otherwise pretty JSON"
                }
            },
            "required": ["cql"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "page": {
                    "type": "object",
                    "properties": {
                        "total": { "type": "integer", "minimum": 0 },
                        "start": { "type": "integer", "minimum": 0 },
                        "limit": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["total", "start", "limit"],
                    "additionalProperties": false
                },
                "results": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "minLength": 1 },
                            "title": { "type": "string", "minLength": 1 },
                            "type": nullable("string"),
                            "url": nullable("string"),
                            "spaceKey": nullable("string"),
                            "spaceName": nullable("string"),
                            "excerpt": nullable("string"),
                            "lastModified": nullable("string")
                        },
                        "required": [
                            "id", "title", "type", "url", "spaceKey",
                            "spaceName", "excerpt", "lastModified"
                        ],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["page", "results"],
            "additionalProperties": false
        }))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let params = validate_params(&self.parameters_schema(), &params)?;

        let cql = params["cql"].as_str().unwrap_or_default();
        validate_cql(cql).map_err(|e| ToolError::InvalidParams(e.to_string()))?;

        let max_limit = ctx.config().confluence.search_max_limit;
        let limit = params["limit"]
            .as_u64()
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .min(u64::from(max_limit)) as u32;
        let start = u32::try_from(params["start"].as_u64().unwrap_or(0))
            .map_err(|_| ToolError::InvalidParams("parameter 'start' is too large".into()))?;
        let as_markdown = params["asMarkdown"].as_bool().unwrap_or(true);

        let request = SearchRequestParams {
            cql: merge_default_cql(cql, &ctx.config().confluence.default_cql),
            limit,
            start,
        };

        tracing::info!(
            tool = SEARCH_TOOL_NAME,
            cql = %request.cql,
            limit = request.limit,
            start = request.start,
            "tool called"
        );

        match ctx.gateway().search(&request).await {
            Ok(page) => {
                let out = SearchToolOutput::from(page);
                let structured = serde_json::to_value(&out)?;
                let text = if as_markdown {
                    render_search_markdown(&out)
                } else {
                    serde_json::to_string_pretty(&structured)?
                };
                Ok(ToolOutput::success(text, structured))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(tool = SEARCH_TOOL_NAME, error = %message, "tool error");

                let fallback = SearchToolOutput {
                    results: Vec::new(),
                    page: PageOutput {
                        total: 0,
                        start,
                        limit,
                    },
                };
                Ok(ToolOutput::failure(
                    error_text(&message),
                    serde_json::to_value(&fallback)?,
                ))
            }
        }
    }
}

fn render_search_markdown(out: &SearchToolOutput) -> String {
    let mut lines = vec![
        format!("total size: {}", out.page.total),
        format!("size={}, limit={}", out.results.len(), out.page.limit),
        String::new(),
    ];

    for r in &out.results {
        match &r.url {
            Some(url) => lines.push(format!("- [{} id={}]({})", r.title, r.id, url)),
            None => lines.push(format!("- {} id={}", r.title, r.id)),
        }
        if let Some(excerpt) = r.excerpt.as_deref().filter(|e| !e.is_empty()) {
            lines.push(format!("  - {}", excerpt));
        }
        if let Some(updated) = &r.last_modified {
            lines.push(format!("  - updated: {}", updated));
        }
        if let Some(space) = &r.space_key {
            lines.push(format!("  - space: {}", space));
        }
    }

    lines.join("\n")
}

// ═══════════════════════════════════════════════════════════════════════
// Get Content
// ═══════════════════════════════════════════════════════════════════════

/// `confluence_get_content`: one page or blog post by id, with the body
/// converted and truncated for agent consumption.
pub struct GetContentTool;

#[derive(Debug, Serialize)]
struct GetContentToolOutput {
    content: ContentOutput,
    truncated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentOutput {
    id: String,
    title: String,
    #[serde(rename = "type")]
    content_type: Option<String>,
    url: Option<String>,
    space_key: Option<String>,
    space_name: Option<String>,
    updated: Option<String>,
    version: Option<ContentVersion>,
    body: Option<BodyOutput>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BodyOutput {
    representation: BodyRepresentation,
    value: String,
}

/// Shapes a fetched item: converts the body when asked, then truncates.
fn shape_content(
    item: ContentItem,
    body_max_chars: usize,
    as_markdown: bool,
) -> GetContentToolOutput {
    let mut truncated = false;
    let body = item.body.map(|b| {
        let text = if as_markdown {
            html_to_markdown(&b.value)
        } else {
            b.value
        };
        let (value, cut) = truncate_chars(&text, body_max_chars);
        truncated = cut;
        BodyOutput {
            representation: b.representation,
            value,
        }
    });

    GetContentToolOutput {
        content: ContentOutput {
            id: item.id,
            title: item.title,
            content_type: item.content_type,
            url: item.url,
            space_key: item.space_key,
            space_name: item.space_name,
            updated: item.updated,
            version: item.version,
            body,
            labels: item.labels,
        },
        truncated,
    }
}

#[async_trait]
impl Tool for GetContentTool {
    fn name(&self) -> &str {
        GET_CONTENT_TOOL_NAME
    }

    fn title(&self) -> Option<&str> {
        Some("Confluence Get Content")
    }

    fn description(&self) -> &str {
        "Get a Confluence content by id and return a normalized result. Read-only, with body truncation."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": ["string", "integer"],
                    "description": "Confluence content ID"
                },
                "representation": {
                    "type": "string",
                    "enum": ["storage", "view", "export_view"],
                    "default": "storage",
                    "description": "Preferred body representation. Falls back to storage, then view (then export_view on Cloud) when unavailable."
                },
                "includeLabels": {
                    "type": "boolean",
                    "default": false,
                    "description": "If true, include labels in the response"
                },
                "bodyMaxChars": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Max characters of body text in the output. Clamped to the server's configured range."
                },
                "asMarkdown": {
                    "type": "boolean",
                    "default": true,
                    "description": "If true, the body is converted to Markdown and the text output is Markdown"
                }
            },
            "required": ["id"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "minLength": 1 },
                        "title": { "type": "string" },
                        "type": nullable("string"),
                        "url": nullable("string"),
                        "spaceKey": nullable("string"),
                        "spaceName": nullable("string"),
                        "updated": nullable("string"),
                        "version": { "type": ["string", "integer", "null"] },
                        "body": {
                            "type": ["object", "null"],
                            "properties": {
                                "representation": {
                                    "type": "string",
                                    "enum": ["storage", "view", "export_view"]
                                },
                                "value": { "type": "string" }
                            },
                            "required": ["representation", "value"],
                            "additionalProperties": false
                        },
                        "labels": {
                            "type": ["array", "null"],
                            "items": { "type": "string" }
                        }
                    },
                    "required": [
                        "id", "title", "type", "url", "spaceKey", "spaceName",
                        "updated", "version", "body", "labels"
                    ],
                    "additionalProperties": false
                },
                "truncated": { "type": "boolean" }
            },
            "required": ["content", "truncated"],
            "additionalProperties": false
        }))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let params = validate_params(&self.parameters_schema(), &params)?;

        let id = content_id(&params["id"])?;
        let representation = params["representation"]
            .as_str()
            .and_then(BodyRepresentation::parse)
            .unwrap_or_default();
        let include_labels = params["includeLabels"].as_bool().unwrap_or(false);
        let as_markdown = params["asMarkdown"].as_bool().unwrap_or(true);

        let cap = ctx.config().confluence.body_max_chars;
        let requested = params["bodyMaxChars"]
            .as_u64()
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(cap);
        let body_max_chars = requested.max(MIN_BODY_MAX_CHARS).min(cap);

        let request = GetContentParams {
            id,
            body_representation: representation,
            include_labels,
        };

        tracing::info!(
            tool = GET_CONTENT_TOOL_NAME,
            id = %request.id,
            representation = %representation,
            include_labels,
            body_max_chars,
            "tool called"
        );

        match ctx.gateway().get_content(&request).await {
            Ok(item) => {
                let out = shape_content(item, body_max_chars, as_markdown);
                let structured = serde_json::to_value(&out)?;
                let text = if as_markdown {
                    render_content_markdown(&out)
                } else {
                    serde_json::to_string_pretty(&structured)?
                };
                Ok(ToolOutput::success(text, structured))
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(tool = GET_CONTENT_TOOL_NAME, error = %message, "tool error");
                Ok(ToolOutput::failure(error_text(&message), Value::Null))
            }
        }
    }
}

/// Accepts a non-empty string or a non-negative integer.
fn content_id(value: &Value) -> Result<String, ToolError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => n.as_u64().map(|n| n.to_string()).ok_or_else(|| {
            ToolError::InvalidParams("parameter 'id' must be a non-negative integer".into())
        }),
        _ => Err(ToolError::InvalidParams(
            "parameter 'id' must not be empty".into(),
        )),
    }
}

fn render_content_markdown(out: &GetContentToolOutput) -> String {
    let c = &out.content;
    let mut lines = Vec::new();

    match &c.url {
        Some(url) => lines.push(format!("# [{}]({})", c.title, url)),
        None => lines.push(format!("# {}", c.title)),
    }
    lines.push(String::new());

    lines.push(format!("- id: {}", c.id));
    if let Some(t) = &c.content_type {
        lines.push(format!("- type: {}", t));
    }
    if let Some(key) = &c.space_key {
        lines.push(format!("- spaceKey: {}", key));
    }
    if let Some(name) = &c.space_name {
        lines.push(format!("- spaceName: {}", name));
    }
    if let Some(updated) = &c.updated {
        lines.push(format!("- updated: {}", updated));
    }
    if let Some(version) = &c.version {
        lines.push(format!("- version: {}", version));
    }
    if let Some(labels) = c.labels.as_ref().filter(|l| !l.is_empty()) {
        lines.push(format!("- labels: {}", labels.join(", ")));
    }

    if let Some(body) = &c.body {
        lines.push(String::new());
        lines.push(format!("## body ({})", body.representation));
        lines.push(String::new());
        lines.push(body.value.clone());
        if out.truncated {
            lines.push(String::new());
            lines.push("_(body truncated)_".to_string());
        }
    }

    lines.join("\n")
}

/// `{"type": [t, "null"]}`
fn nullable(t: &str) -> Value {
    json!({ "type": [t, "null"] })
}

fn error_text(message: &str) -> String {
    serde_json::to_string_pretty(&json!({ "isError": true, "error": message }))
        .unwrap_or_else(|_| message.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter Validation
// ═══════════════════════════════════════════════════════════════════════

/// Validate incoming JSON parameters against a tool's schema.
///
/// Checks that params is an object, rejects unknown keys when the schema
/// sets `additionalProperties: false`, then checks required fields, types
/// (a `type` array means any of), `minimum` and `enum`. Missing optional
/// fields with a `default` get it injected.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value, ToolError> {
    let empty = Map::new();
    let params_obj = match params {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ToolError::InvalidParams(format!(
                "parameters must be an object, got {}",
                json_type_name(other)
            )))
        }
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        if let Some(unknown) = params_obj.keys().find(|k| !properties.contains_key(*k)) {
            return Err(ToolError::InvalidParams(format!(
                "unknown parameter: {}",
                unknown
            )));
        }
    }

    let required = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
        .unwrap_or_default();

    for req_field in required {
        if params_obj.get(req_field).map_or(true, Value::is_null) {
            return Err(ToolError::InvalidParams(format!(
                "missing required parameter: {}",
                req_field
            )));
        }
    }

    let mut result = params_obj.clone();

    for (prop_name, prop_schema) in &properties {
        let Some(value) = params_obj.get(prop_name).filter(|v| !v.is_null()) else {
            result.remove(prop_name);
            if let Some(default) = prop_schema.get("default") {
                result.insert(prop_name.clone(), default.clone());
            }
            continue;
        };

        let expected: Vec<&str> = match prop_schema.get("type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(ts)) => ts.iter().filter_map(|t| t.as_str()).collect(),
            _ => Vec::new(),
        };
        if !expected.is_empty() && !expected.iter().any(|t| type_matches(t, value)) {
            return Err(ToolError::InvalidParams(format!(
                "parameter '{}' must be of type '{}', got {}",
                prop_name,
                expected.join("' or '"),
                json_type_name(value)
            )));
        }

        if let (Some(min), Some(n)) = (
            prop_schema.get("minimum").and_then(|m| m.as_f64()),
            value.as_f64(),
        ) {
            if n < min {
                return Err(ToolError::InvalidParams(format!(
                    "parameter '{}' must be >= {}, got {}",
                    prop_name, min, value
                )));
            }
        }

        if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
            if !enum_values.contains(value) {
                let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                return Err(ToolError::InvalidParams(format!(
                    "parameter '{}' must be one of [{}], got {}",
                    prop_name,
                    allowed.join(", "),
                    value
                )));
            }
        }
    }

    Ok(Value::Object(result))
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

/// Return a human-readable name for a JSON value's type.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools.
///
/// ```rust
/// use confluence_mcp::tools::ToolRegistry;
///
/// let tools = ToolRegistry::with_builtins();
/// assert!(tools.find("confluence_search").is_some());
/// ```
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding `confluence_search` and `confluence_get_content`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchTool));
        registry.register(Box::new(GetContentTool));
        registry
    }

    /// Register a tool. A later tool with the same name is never found.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Get all registered tools.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Return the count of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confluence::GatewayError;
    use crate::diagnostics::Dialect;
    use crate::http::HttpError;
    use crate::models::{ContentBody, SearchResultItem};
    use std::sync::Mutex;

    /// Gateway double that records requests and replays canned answers.
    #[derive(Default)]
    struct FakeGateway {
        searches: Mutex<Vec<SearchRequestParams>>,
        fetches: Mutex<Vec<GetContentParams>>,
        page: Option<SearchResponsePage>,
        item: Option<ContentItem>,
    }

    fn backend_down() -> GatewayError {
        GatewayError::Http(HttpError::Status {
            status: 503,
            status_text: "Service Unavailable".into(),
            body: "maintenance".into(),
        })
    }

    #[async_trait]
    impl ConfluenceGateway for FakeGateway {
        fn dialect(&self) -> Dialect {
            Dialect::Cloud
        }

        async fn search(
            &self,
            params: &SearchRequestParams,
        ) -> Result<SearchResponsePage, GatewayError> {
            self.searches.lock().unwrap().push(params.clone());
            self.page.clone().ok_or_else(backend_down)
        }

        async fn get_content(
            &self,
            params: &GetContentParams,
        ) -> Result<ContentItem, GatewayError> {
            self.fetches.lock().unwrap().push(params.clone());
            self.item.clone().ok_or_else(backend_down)
        }
    }

    fn config() -> Config {
        let mut config = Config::minimal("cloud", "https://acme.atlassian.net");
        config.confluence.search_max_limit = 25;
        config.confluence.body_max_chars = 500;
        config
    }

    fn ctx(config: Config, gateway: Arc<FakeGateway>) -> ToolContext {
        ToolContext::new(Arc::new(config), gateway)
    }

    fn page() -> SearchResponsePage {
        SearchResponsePage {
            total: 42,
            start: 0,
            limit: 10,
            results: vec![SearchResultItem {
                id: "123".into(),
                title: "Deploy runbook".into(),
                content_type: Some("page".into()),
                url: Some("https://acme.atlassian.net/wiki/spaces/OPS/pages/123".into()),
                space_key: Some("OPS".into()),
                space_name: None,
                excerpt: Some("how to deploy".into()),
                last_modified: Some("2024-03-04".into()),
            }],
        }
    }

    fn item(body: &str) -> ContentItem {
        ContentItem {
            id: "123".into(),
            title: "Deploy runbook".into(),
            content_type: Some("page".into()),
            url: Some("https://acme.atlassian.net/wiki/spaces/OPS/pages/123".into()),
            space_key: Some("OPS".into()),
            space_name: Some("Operations".into()),
            updated: Some("2024-03-04".into()),
            version: Some(ContentVersion::Number(7)),
            body: Some(ContentBody {
                representation: BodyRepresentation::Storage,
                value: body.to_string(),
            }),
            labels: Some(vec!["ops".into(), "runbook".into()]),
        }
    }

    // ── validate_params ──

    #[test]
    fn test_validate_injects_defaults() {
        let params =
            validate_params(&SearchTool.parameters_schema(), &json!({"cql": "a = b"})).unwrap();
        assert_eq!(params["limit"], 10);
        assert_eq!(params["start"], 0);
        assert_eq!(params["asMarkdown"], true);
    }

    #[test]
    fn test_validate_rejects_unknown_keys() {
        let err = validate_params(
            &SearchTool.parameters_schema(),
            &json!({"cql": "a = b", "spaceKey": "OPS"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter: spaceKey");
    }

    #[test]
    fn test_validate_missing_required() {
        let err = validate_params(&SearchTool.parameters_schema(), &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: cql");
    }

    #[test]
    fn test_validate_type_and_minimum() {
        let schema = SearchTool.parameters_schema();
        let err = validate_params(&schema, &json!({"cql": "a = b", "limit": "ten"})).unwrap_err();
        assert!(err.to_string().contains("must be of type 'integer'"));

        let err = validate_params(&schema, &json!({"cql": "a = b", "limit": 0})).unwrap_err();
        assert!(err.to_string().contains("must be >= 1"));

        let err = validate_params(&schema, &json!({"cql": "a = b", "start": -1})).unwrap_err();
        assert!(err.to_string().contains("must be >= 0"));
    }

    #[test]
    fn test_validate_type_union_and_enum() {
        let schema = GetContentTool.parameters_schema();
        assert!(validate_params(&schema, &json!({"id": 123})).is_ok());
        assert!(validate_params(&schema, &json!({"id": "123"})).is_ok());
        assert!(validate_params(&schema, &json!({"id": true})).is_err());

        let err =
            validate_params(&schema, &json!({"id": "1", "representation": "html"})).unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn test_validate_rejects_non_object() {
        let err = validate_params(&SearchTool.parameters_schema(), &json!([1])).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    // ── confluence_search ──

    #[tokio::test]
    async fn test_search_clamps_limit_and_merges_default_cql() {
        let gateway = Arc::new(FakeGateway {
            page: Some(page()),
            ..Default::default()
        });
        let mut cfg = config();
        cfg.confluence.default_cql = "space = OPS".into();
        let ctx = ctx(cfg, gateway.clone());

        let out = SearchTool
            .execute(
                json!({"cql": "title ~ deploy ORDER BY created DESC", "limit": 500, "start": 20}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(!out.is_error);

        let sent = gateway.searches.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].cql,
            "(space = OPS) AND (title ~ deploy) ORDER BY created DESC"
        );
        assert_eq!(sent[0].limit, 25);
        assert_eq!(sent[0].start, 20);
    }

    #[tokio::test]
    async fn test_search_structured_output_uses_nulls() {
        let gateway = Arc::new(FakeGateway {
            page: Some(page()),
            ..Default::default()
        });
        let out = SearchTool
            .execute(json!({"cql": "type = page"}), &ctx(config(), gateway))
            .await
            .unwrap();

        assert_eq!(out.structured["page"], json!({"total": 42, "start": 0, "limit": 10}));
        let hit = &out.structured["results"][0];
        assert_eq!(hit["id"], "123");
        assert_eq!(hit["type"], "page");
        assert!(hit["spaceName"].is_null());
        assert!(hit.as_object().unwrap().contains_key("spaceName"));
    }

    #[tokio::test]
    async fn test_search_markdown_text() {
        let gateway = Arc::new(FakeGateway {
            page: Some(page()),
            ..Default::default()
        });
        let out = SearchTool
            .execute(json!({"cql": "type = page"}), &ctx(config(), gateway))
            .await
            .unwrap();

        let expected = "total size: 42\n\
                        size=1, limit=10\n\
                        \n\
                        - [Deploy runbook id=123](https://acme.atlassian.net/wiki/spaces/OPS/pages/123)\n  \
                        - how to deploy\n  \
                        - updated: 2024-03-04\n  \
                        - space: OPS";
        assert_eq!(out.text, expected);
    }

    #[tokio::test]
    async fn test_search_json_text_when_not_markdown() {
        let gateway = Arc::new(FakeGateway {
            page: Some(page()),
            ..Default::default()
        });
        let out = SearchTool
            .execute(json!({"cql": "type = page", "asMarkdown": false}), &ctx(config(), gateway))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(parsed, out.structured);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_cql_without_calling_backend() {
        let gateway = Arc::new(FakeGateway::default());
        let err = SearchTool
            .execute(json!({"cql": "title"}), &ctx(config(), gateway.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::InvalidParams(m)) if m == "Missing operator"
        ));
        assert!(gateway.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_backend_failure_is_error_output() {
        let gateway = Arc::new(FakeGateway::default());
        let out = SearchTool
            .execute(json!({"cql": "type = page", "start": 5}), &ctx(config(), gateway))
            .await
            .unwrap();

        assert!(out.is_error);
        let text: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(text["isError"], true);
        assert_eq!(text["error"], "HTTP 503 Service Unavailable: maintenance");
        assert_eq!(
            out.structured,
            json!({"results": [], "page": {"total": 0, "start": 5, "limit": 10}})
        );
    }

    // ── confluence_get_content ──

    #[tokio::test]
    async fn test_get_content_defaults_and_numeric_id() {
        let gateway = Arc::new(FakeGateway {
            item: Some(item("<p>hello</p>")),
            ..Default::default()
        });
        GetContentTool
            .execute(json!({"id": 123}), &ctx(config(), gateway.clone()))
            .await
            .unwrap();

        let sent = gateway.fetches.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![GetContentParams {
                id: "123".into(),
                body_representation: BodyRepresentation::Storage,
                include_labels: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_get_content_passes_representation_and_labels() {
        let gateway = Arc::new(FakeGateway {
            item: Some(item("<p>hello</p>")),
            ..Default::default()
        });
        GetContentTool
            .execute(
                json!({"id": " 77 ", "representation": "export_view", "includeLabels": true}),
                &ctx(config(), gateway.clone()),
            )
            .await
            .unwrap();

        let sent = gateway.fetches.lock().unwrap().clone();
        assert_eq!(sent[0].id, "77");
        assert_eq!(sent[0].body_representation, BodyRepresentation::ExportView);
        assert!(sent[0].include_labels);
    }

    #[tokio::test]
    async fn test_get_content_rejects_empty_id() {
        let gateway = Arc::new(FakeGateway::default());
        let err = GetContentTool
            .execute(json!({"id": "   "}), &ctx(config(), gateway.clone()))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<ToolError>().is_some());

        let err = GetContentTool
            .execute(json!({"id": -4}), &ctx(config(), gateway.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
        assert!(gateway.fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_content_truncates_raw_body_by_chars() {
        let body = "é".repeat(1000);
        let gateway = Arc::new(FakeGateway {
            item: Some(item(&body)),
            ..Default::default()
        });
        let out = GetContentTool
            .execute(
                json!({"id": "123", "asMarkdown": false, "bodyMaxChars": 150}),
                &ctx(config(), gateway),
            )
            .await
            .unwrap();

        assert_eq!(out.structured["truncated"], true);
        let value = out.structured["content"]["body"]["value"].as_str().unwrap();
        assert_eq!(value.chars().count(), 150);
    }

    #[tokio::test]
    async fn test_get_content_body_max_chars_clamped_to_range() {
        let body = "x".repeat(2000);
        let gateway = Arc::new(FakeGateway {
            item: Some(item(&body)),
            ..Default::default()
        });
        let ctx = ctx(config(), gateway);

        let out = GetContentTool
            .execute(json!({"id": "1", "asMarkdown": false, "bodyMaxChars": 5}), &ctx)
            .await
            .unwrap();
        let value = out.structured["content"]["body"]["value"].as_str().unwrap();
        assert_eq!(value.len(), 100);

        let out = GetContentTool
            .execute(json!({"id": "1", "asMarkdown": false, "bodyMaxChars": 100000}), &ctx)
            .await
            .unwrap();
        let value = out.structured["content"]["body"]["value"].as_str().unwrap();
        assert_eq!(value.len(), 500);

        let out = GetContentTool
            .execute(json!({"id": "1", "asMarkdown": false}), &ctx)
            .await
            .unwrap();
        let value = out.structured["content"]["body"]["value"].as_str().unwrap();
        assert_eq!(value.len(), 500);
    }

    #[tokio::test]
    async fn test_get_content_markdown_rendering() {
        let gateway = Arc::new(FakeGateway {
            item: Some(item("<p>hello world</p>")),
            ..Default::default()
        });
        let out = GetContentTool
            .execute(json!({"id": "123"}), &ctx(config(), gateway))
            .await
            .unwrap();

        assert!(out.text.starts_with(
            "# [Deploy runbook](https://acme.atlassian.net/wiki/spaces/OPS/pages/123)\n\n- id: 123\n- type: page\n"
        ));
        assert!(out.text.contains("- spaceKey: OPS\n- spaceName: Operations\n"));
        assert!(out.text.contains("- version: 7\n"));
        assert!(out.text.contains("- labels: ops, runbook\n"));
        assert!(out.text.contains("## body (storage)\n\n"));
        assert!(out.text.contains("hello world"));
        assert!(!out.text.contains("<p>"));
        assert_eq!(out.structured["truncated"], false);
        assert_eq!(out.structured["content"]["version"], 7);
    }

    #[tokio::test]
    async fn test_get_content_absent_fields_are_null() {
        let mut bare = item("");
        bare.body = None;
        bare.labels = None;
        bare.url = None;
        let gateway = Arc::new(FakeGateway {
            item: Some(bare),
            ..Default::default()
        });
        let out = GetContentTool
            .execute(json!({"id": "123", "asMarkdown": false}), &ctx(config(), gateway))
            .await
            .unwrap();

        let content = out.structured["content"].as_object().unwrap();
        assert!(content["body"].is_null());
        assert!(content["labels"].is_null());
        assert!(content["url"].is_null());
        assert_eq!(out.structured["truncated"], false);
    }

    #[tokio::test]
    async fn test_get_content_backend_failure() {
        let gateway = Arc::new(FakeGateway::default());
        let out = GetContentTool
            .execute(json!({"id": "123"}), &ctx(config(), gateway))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.structured.is_null());
        assert!(out.text.contains("HTTP 503"));
    }

    // ── output schemas ──

    #[tokio::test]
    async fn test_search_output_matches_advertised_fields() {
        let gateway = Arc::new(FakeGateway {
            page: Some(page()),
            ..Default::default()
        });
        let out = SearchTool
            .execute(json!({"cql": "type = page"}), &ctx(config(), gateway))
            .await
            .unwrap();

        let schema = SearchTool.output_schema().unwrap();
        let hit_schema = &schema["properties"]["results"]["items"];
        let mut advertised: Vec<&str> = hit_schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        let mut emitted: Vec<&str> = out.structured["results"][0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        advertised.sort();
        emitted.sort();
        assert_eq!(advertised, emitted);
        assert_eq!(hit_schema["properties"]["spaceName"]["type"], json!(["string", "null"]));
    }

    #[tokio::test]
    async fn test_get_content_output_matches_advertised_fields() {
        let gateway = Arc::new(FakeGateway {
            item: Some(item("<p>hi</p>")),
            ..Default::default()
        });
        let out = GetContentTool
            .execute(json!({"id": "123"}), &ctx(config(), gateway))
            .await
            .unwrap();

        let schema = GetContentTool.output_schema().unwrap();
        assert_eq!(schema["required"], json!(["content", "truncated"]));
        let content_schema = &schema["properties"]["content"];
        for key in content_schema["required"].as_array().unwrap() {
            let key = key.as_str().unwrap();
            assert!(
                out.structured["content"].get(key).is_some(),
                "missing {key}"
            );
        }
        assert_eq!(content_schema["properties"]["body"]["type"], json!(["object", "null"]));
    }

    // ── registry ──

    #[test]
    fn test_registry_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert!(registry.find(SEARCH_TOOL_NAME).is_some());
        assert!(registry.find(GET_CONTENT_TOOL_NAME).is_some());
        assert!(registry.find("search").is_none());
        assert!(ToolRegistry::new().is_empty());
    }
}
