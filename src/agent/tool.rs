//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results.
//! Tools expose the external search backend and code sandbox as
//! function-calling targets. `respond` names the model's plain-text answer
//! and has no function definition.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// The plain-text answer "tool".
pub const RESPOND: &str = "respond";
/// Web search tool name.
pub const WEB_SEARCH: &str = "web_search";
/// Page fetch tool name.
pub const WEB_FETCH: &str = "web_fetch";
/// Sandboxed execution tool name.
pub const CODE_EXECUTE: &str = "code_execute";
/// Static analysis tool name.
pub const CODE_ANALYZE: &str = "code_analyze";

/// Every known tool name.
pub const ALL_TOOLS: [&str; 5] = [RESPOND, WEB_SEARCH, WEB_FETCH, CODE_EXECUTE, CODE_ANALYZE];

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match dispatch table in executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON string on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions offered to the model.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Consumes the set, returning its definitions.
    #[must_use]
    pub fn into_definitions(self) -> Vec<ToolDefinition> {
        self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Every function tool: `web_search`, `web_fetch`, `code_execute`,
    /// `code_analyze`.
    #[must_use]
    pub fn all() -> Self {
        Self {
            definitions: vec![
                def_web_search(),
                def_web_fetch(),
                def_code_execute(),
                def_code_analyze(),
            ],
        }
    }

    /// Keeps only the named tools.
    #[must_use]
    pub fn filtered(self, allowed: &[&str]) -> Self {
        Self {
            definitions: self
                .definitions
                .into_iter()
                .filter(|d| allowed.contains(&d.name.as_str()))
                .collect(),
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

/// Defines the `web_search` tool.
fn def_web_search() -> ToolDefinition {
    ToolDefinition {
        name: WEB_SEARCH.to_string(),
        description: "Search the web. Returns an array of hits (title, url, snippet) \
                       ordered by relevance."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query."
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 20,
                    "description": "Maximum hits to return. Default: 5."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `web_fetch` tool.
fn def_web_fetch() -> ToolDefinition {
    ToolDefinition {
        name: WEB_FETCH.to_string(),
        description: "Fetch a web page and return its text content.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Absolute http(s) URL."
                }
            },
            "required": ["url"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `code_execute` tool.
fn def_code_execute() -> ToolDefinition {
    ToolDefinition {
        name: CODE_EXECUTE.to_string(),
        description: "Run code in an isolated sandbox. Returns stdout, stderr and the \
                       exit code."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "language": {
                    "type": "string",
                    "description": "Language of the snippet (e.g. \"python\"). Default: python."
                },
                "code": {
                    "type": "string",
                    "description": "Source code to run."
                }
            },
            "required": ["code"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `code_analyze` tool.
fn def_code_analyze() -> ToolDefinition {
    ToolDefinition {
        name: CODE_ANALYZE.to_string(),
        description: "Statically analyze code without running it. Returns findings as text."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Source code to analyze."
                }
            },
            "required": ["code"],
            "additionalProperties": false
        }),
    }
}
