//! CODE: tool-assisted code answers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{Services, StrategyContext, StrategyHandler, with_quality_retry};
use crate::agent::executor::ToolExecutor;
use crate::agent::tool::{ToolDefinition, ToolSet};
use crate::agent::traits::{Agent, execute_with_tools};
use crate::context::{allowed_for, apply_mask};
use crate::core::Mode;
use crate::error::EngineError;

/// Agent configuration for one CODE request.
struct CodeAgent<'a> {
    system_prompt: &'a str,
    tools: Vec<ToolDefinition>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_tool_iterations: usize,
}

#[async_trait]
impl Agent for CodeAgent<'_> {
    fn name(&self) -> &'static str {
        "code"
    }

    fn system_prompt(&self) -> &str {
        self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.0)
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(4096)
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.clone()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

/// Writes, runs and analyzes code through the agentic tool loop.
///
/// Tools are filtered by the CODE tool mask and only offered when a
/// sandbox is configured. Without one the model answers tool-less.
#[derive(Debug)]
pub struct CodeStrategy {
    services: Arc<Services>,
}

impl CodeStrategy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl StrategyHandler for CodeStrategy {
    fn mode(&self) -> Mode {
        Mode::Code
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let services = &self.services;
        let sandbox = services.collaborators.sandbox.clone();

        let tools = if sandbox.is_some() {
            apply_mask(Mode::Code.as_str(), ToolSet::all().definitions())
        } else {
            debug!("no sandbox configured; answering without tools");
            Vec::new()
        };
        ctx.set_metadata(
            "tools",
            json!(tools.iter().map(|t| &t.name).collect::<Vec<_>>()),
        );

        let agent = CodeAgent {
            system_prompt: &services.prompts.code,
            tools,
            temperature: ctx.request.sampling().temperature,
            max_tokens: ctx.request.sampling().max_tokens,
            max_tool_iterations: services.settings.max_tool_iterations,
        };
        let executor = ToolExecutor::new(allowed_for(Mode::Code)).with_sandbox(sandbox);
        let query = ctx.request.query().to_string();

        with_quality_retry(ctx, services.settings.quality_retries, &query, |prompt| {
            let (agent, executor) = (&agent, &executor);
            async move {
                let response = execute_with_tools(agent, &services.client, &prompt, executor).await?;
                Ok((response.content, response.usage))
            }
        })
        .await
    }
}
