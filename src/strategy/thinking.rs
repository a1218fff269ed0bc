//! THINKING: deliberate reasoning with plan recitation.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::{Services, StrategyContext, StrategyHandler, generate};
use crate::context::PlanRecitation;
use crate::core::Mode;
use crate::error::EngineError;

/// `<reasoning> ... </reasoning>`, across lines.
static REASONING_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<reasoning>(.*?)</reasoning>").ok());

/// Reasons step by step, anchored to a recited plan.
///
/// The reasoning block is moved into the `reasoning` metadata and only
/// the final answer is returned.
#[derive(Debug)]
pub struct ThinkingStrategy {
    services: Arc<Services>,
}

impl ThinkingStrategy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

/// Splits model output into (reasoning, answer).
///
/// Output without a reasoning block is all answer. A reasoning block with
/// nothing after it leaves the reasoning as the answer.
fn split_reasoning(output: &str) -> (Option<String>, String) {
    let Some(caps) = REASONING_BLOCK.as_ref().and_then(|re| re.captures(output)) else {
        return (None, output.trim().to_string());
    };
    let reasoning = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
    let answer = caps
        .get(0)
        .map_or(output, |m| &output[m.end()..])
        .trim()
        .to_string();
    if answer.is_empty() {
        (None, reasoning)
    } else {
        (Some(reasoning), answer)
    }
}

#[async_trait]
impl StrategyHandler for ThinkingStrategy {
    fn mode(&self) -> Mode {
        Mode::Thinking
    }

    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let query = ctx.request.query().to_string();
        let mut plan = PlanRecitation::new();
        plan.create_initial_plan(&query, Mode::Thinking);
        let prompt = format!("{}{query}", plan.build_recitation_prefix());

        let output = generate(&self.services, ctx, &self.services.prompts.thinking, &prompt).await?;
        let (reasoning, answer) = split_reasoning(&output);

        if let Some(reasoning) = reasoning {
            plan.update_from_output(&reasoning);
            ctx.set_metadata("reasoning", json!(reasoning));
        }
        ctx.set_metadata("plan", json!(plan.plan()));
        Ok(answer)
    }
}
