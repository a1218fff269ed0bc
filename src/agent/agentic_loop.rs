//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached.

use tracing::debug;

use super::executor::ToolExecutor;
use crate::error::EngineError;
use crate::llm::message::{ChatRequest, ChatResponse, assistant_tool_calls_message, tool_message};
use crate::resilience::FallbackClient;

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Continues until the model responds without tool calls (i.e., it produces
/// a final text answer) or `max_iterations` is reached.
///
/// # Arguments
///
/// * `client` - Provider chain to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls to external collaborators.
/// * `max_iterations` - Safety limit on round-trips.
///
/// # Returns
///
/// The final [`ChatResponse`] with `usage` summed over every round.
///
/// # Errors
///
/// Returns [`EngineError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates any provider errors. Tool
/// failures are returned to the model, not raised.
pub async fn agentic_loop(
    client: &FallbackClient,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
) -> Result<ChatResponse, EngineError> {
    let mut usage = crate::llm::message::TokenUsage::default();

    for iteration in 0..max_iterations {
        let mut response = client.chat(request).await?;
        usage.accumulate(response.usage);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            response.usage = usage;
            return Ok(response);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        for call in &response.tool_calls {
            let result = executor.execute(call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(EngineError::ToolLoopExceeded { max_iterations })
}
