//! Tool executor that dispatches tool calls to external collaborators.
//!
//! Maps tool names to [`WebSearch`] and [`CodeSandbox`] calls. Only tools
//! allowed by the executor's mask are dispatched; everything else comes
//! back as an error result for the model to read.

use std::sync::Arc;

use serde::Deserialize;

use super::tool::{CODE_ANALYZE, CODE_EXECUTE, ToolCall, ToolResult, WEB_FETCH, WEB_SEARCH};
use crate::error::EngineError;
use crate::strategy::collaborators::{CodeSandbox, WebSearch};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Default number of hits for `web_search`.
const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Maximum number of hits for `web_search`.
const MAX_SEARCH_LIMIT: usize = 20;
/// Maximum characters of fetched page text returned to the model.
const MAX_FETCH_CHARS: usize = 20_000;

/// Executes tool calls against the configured collaborators.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    web_search: Option<Arc<dyn WebSearch>>,
    sandbox: Option<Arc<dyn CodeSandbox>>,
    allowed: Vec<String>,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("web_search", &self.web_search.is_some())
            .field("sandbox", &self.sandbox.is_some())
            .field("allowed", &self.allowed)
            .finish()
    }
}

impl ToolExecutor {
    /// Creates an executor that permits the `allowed` tool names.
    #[must_use]
    pub fn new(allowed: &[&str]) -> Self {
        Self {
            web_search: None,
            sandbox: None,
            allowed: allowed.iter().map(ToString::to_string).collect(),
        }
    }

    /// Attaches a web search backend.
    #[must_use]
    pub fn with_web_search(mut self, web_search: Option<Arc<dyn WebSearch>>) -> Self {
        self.web_search = web_search;
        self
    }

    /// Attaches a code sandbox.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: Option<Arc<dyn CodeSandbox>>) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Whether `name` may be dispatched.
    #[must_use]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.iter().any(|a| a == name)
    }

    /// Dispatches a tool call to the matching collaborator.
    ///
    /// Never fails: errors become results with `is_error` set.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let result = if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            Err(tool_error(
                &call.name,
                format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            ))
        } else if !self.is_allowed(&call.name) {
            Err(tool_error(&call.name, "tool not available in this mode"))
        } else {
            match call.name.as_str() {
                WEB_SEARCH => self.tool_web_search(&call.arguments).await,
                WEB_FETCH => self.tool_web_fetch(&call.arguments).await,
                CODE_EXECUTE => self.tool_code_execute(&call.arguments).await,
                CODE_ANALYZE => self.tool_code_analyze(&call.arguments).await,
                other => Err(tool_error(other, "unknown tool")),
            }
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    fn search_backend(&self, tool: &str) -> Result<&Arc<dyn WebSearch>, EngineError> {
        self.web_search
            .as_ref()
            .ok_or_else(|| tool_error(tool, "no web search backend configured"))
    }

    fn sandbox_backend(&self, tool: &str) -> Result<&Arc<dyn CodeSandbox>, EngineError> {
        self.sandbox
            .as_ref()
            .ok_or_else(|| tool_error(tool, "no code sandbox configured"))
    }

    async fn tool_web_search(&self, args: &str) -> Result<String, EngineError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            limit: Option<usize>,
        }

        let args: Args = parse_args(WEB_SEARCH, args)?;
        let limit = args
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);
        let hits = self
            .search_backend(WEB_SEARCH)?
            .search(&args.query, limit)
            .await?;

        serde_json::to_string_pretty(&hits)
            .map_err(|e| tool_error(WEB_SEARCH, format!("serialization error: {e}")))
    }

    async fn tool_web_fetch(&self, args: &str) -> Result<String, EngineError> {
        #[derive(Deserialize)]
        struct Args {
            url: String,
        }

        let args: Args = parse_args(WEB_FETCH, args)?;
        if !(args.url.starts_with("http://") || args.url.starts_with("https://")) {
            return Err(tool_error(WEB_FETCH, "url must be http(s)"));
        }
        let page = self.search_backend(WEB_FETCH)?.fetch(&args.url).await?;
        Ok(page.chars().take(MAX_FETCH_CHARS).collect())
    }

    async fn tool_code_execute(&self, args: &str) -> Result<String, EngineError> {
        #[derive(Deserialize)]
        struct Args {
            language: Option<String>,
            code: String,
        }

        let args: Args = parse_args(CODE_EXECUTE, args)?;
        let language = args.language.as_deref().unwrap_or("python");
        let output = self
            .sandbox_backend(CODE_EXECUTE)?
            .execute(language, &args.code)
            .await?;

        serde_json::to_string_pretty(&output)
            .map_err(|e| tool_error(CODE_EXECUTE, format!("serialization error: {e}")))
    }

    async fn tool_code_analyze(&self, args: &str) -> Result<String, EngineError> {
        #[derive(Deserialize)]
        struct Args {
            code: String,
        }

        let args: Args = parse_args(CODE_ANALYZE, args)?;
        self.sandbox_backend(CODE_ANALYZE)?.analyze(&args.code).await
    }
}

fn tool_error(name: &str, message: impl Into<String>) -> EngineError {
    EngineError::ToolExecution {
        name: name.to_string(),
        message: message.into(),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(name: &str, args: &str) -> Result<T, EngineError> {
    serde_json::from_str(args).map_err(|e| tool_error(name, format!("invalid arguments: {e}")))
}
