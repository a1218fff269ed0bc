//! Agent trait definition.
//!
//! All agents (planner, decomposer, synthesizer, code) implement this
//! trait, which provides a uniform interface over the provider chain.

use async_trait::async_trait;

use super::executor::ToolExecutor;
use super::tool::ToolDefinition;
use crate::error::EngineError;
use crate::llm::message::{ChatRequest, TokenUsage, system_message, user_message};
use crate::resilience::FallbackClient;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (planning, decomposition, synthesis)
/// with a fixed system prompt and sampling configuration. Callers use
/// [`Agent::execute`] to run the agent against the provider chain.
///
/// Agents that support tool-calling override [`Agent::tools`] to return
/// their available tool definitions and use [`execute_with_tools`]
/// for agentic loop execution.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tool definitions available to this agent.
    ///
    /// Returns an empty vec by default (no tools).
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Maximum tool-calling loop iterations before aborting.
    fn max_tool_iterations(&self) -> usize {
        8
    }

    /// Builds the request for `user_msg` from the agent's configuration.
    fn build_request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            ..ChatRequest::new(vec![
                system_message(self.system_prompt()),
                user_message(user_msg),
            ])
        }
    }

    /// Executes the agent with the given user message (no tools).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the whole provider chain fails.
    async fn execute(
        &self,
        client: &FallbackClient,
        user_msg: &str,
    ) -> Result<AgentResponse, EngineError> {
        let response = client.chat(&self.build_request(user_msg)).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes an agent with tool-calling support.
///
/// If the agent's [`Agent::tools`] returns definitions, builds a tool-enabled
/// request and runs the agentic loop. Otherwise falls through to
/// [`Agent::execute`].
///
/// # Errors
///
/// Returns [`EngineError`] on provider failures or if the tool loop
/// exceeds the agent's max iterations.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    client: &FallbackClient,
    user_msg: &str,
    executor: &ToolExecutor,
) -> Result<AgentResponse, EngineError> {
    let tool_defs = agent.tools();

    if tool_defs.is_empty() {
        return agent.execute(client, user_msg).await;
    }

    let mut request = agent.build_request(user_msg).with_tools(tool_defs);

    let response = super::agentic_loop::agentic_loop(
        client,
        &mut request,
        executor,
        agent.max_tool_iterations(),
    )
    .await?;

    Ok(AgentResponse {
        content: response.content,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}
