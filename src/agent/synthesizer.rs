//! Synthesizer agent for research reports.
//!
//! Takes the findings of every sub-query search and produces the final
//! markdown report.

use async_trait::async_trait;

use super::traits::Agent;

/// Agent that synthesizes findings into a research report.
pub struct SynthesizerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a synthesizer with the given system prompt.
    ///
    /// `max_tokens` defaults to 4096 when not set.
    #[must_use]
    pub fn new(system_prompt: String, max_tokens: Option<u32>) -> Self {
        Self {
            max_tokens: max_tokens.unwrap_or(4096),
            system_prompt,
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
