//! Research planning agent.
//!
//! Produces the checklist plan that seeds plan recitation for the rest of
//! a deep-research workflow.

use async_trait::async_trait;

use super::prompt::build_planner_prompt;
use super::traits::{Agent, AgentResponse};
use crate::error::EngineError;
use crate::resilience::FallbackClient;

/// Agent that writes a research plan for a question.
pub struct PlannerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl PlannerAgent {
    /// Creates a planner with the given system prompt.
    #[must_use]
    pub const fn new(system_prompt: String) -> Self {
        Self {
            max_tokens: 1024,
            system_prompt,
        }
    }

    /// Executes the agent and returns the trimmed plan text.
    ///
    /// The plan may be empty; callers decide how to seed a missing plan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the provider chain fails.
    pub async fn plan(
        &self,
        client: &FallbackClient,
        question: &str,
    ) -> Result<(String, AgentResponse), EngineError> {
        let response = self.execute(client, &build_planner_prompt(question)).await?;
        let plan = Self::clean_plan(&response.content);
        Ok((plan, response))
    }

    /// Strips a surrounding markdown fence, if any.
    fn clean_plan(content: &str) -> String {
        let trimmed = content.trim();
        if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```markdown")
                .trim_start_matches("```md")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
                .to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
