//! Sub-query decomposition agent.
//!
//! Asks the model for a structured list of search sub-queries and parses
//! it out of a delimited block.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::finding::SubQuery;
use super::traits::{Agent, AgentResponse};
use crate::error::EngineError;
use crate::resilience::FallbackClient;

/// `<subqueries> ... </subqueries>`, across lines.
static TAGGED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<subqueries>\s*(.*?)\s*</subqueries>").ok());

/// A fenced ```json block.
static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok());

/// Agent that decomposes a research question into search sub-queries.
pub struct DecomposerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl DecomposerAgent {
    /// Creates a decomposer with the given system prompt.
    #[must_use]
    pub const fn new(system_prompt: String) -> Self {
        Self {
            max_tokens: 1024,
            system_prompt,
        }
    }

    /// Executes the agent and parses at most `max` sub-queries.
    ///
    /// Sub-queries come back sorted by priority (stable within a level).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResponseParse`] if no sub-query can be
    /// parsed, and provider errors as-is.
    pub async fn execute_and_parse(
        &self,
        client: &FallbackClient,
        user_msg: &str,
        max: usize,
    ) -> Result<(Vec<SubQuery>, AgentResponse), EngineError> {
        let response = self.execute(client, user_msg).await?;
        let sub_queries = Self::parse_sub_queries(&response.content, max)?;
        Ok((sub_queries, response))
    }

    /// Parses sub-queries from the agent's response.
    pub(crate) fn parse_sub_queries(content: &str, max: usize) -> Result<Vec<SubQuery>, EngineError> {
        let json_str = extract_block(content);

        let parsed = serde_json::from_str::<Vec<SubQuery>>(json_str).or_else(|array_err| {
            // wrapper object: {"subqueries": [...]}
            serde_json::from_str::<serde_json::Value>(json_str)
                .ok()
                .and_then(|v| {
                    ["subqueries", "sub_queries", "queries"]
                        .iter()
                        .find_map(|key| v.get(key).cloned())
                })
                .and_then(|arr| serde_json::from_value::<Vec<SubQuery>>(arr).ok())
                .ok_or_else(|| EngineError::ResponseParse {
                    message: format!("failed to parse sub-queries: {array_err}"),
                    content: content.to_string(),
                })
        })?;

        let mut sub_queries: Vec<SubQuery> = Vec::with_capacity(parsed.len());
        for mut sq in parsed {
            sq.sanitize();
            let duplicate = sub_queries
                .iter()
                .any(|s| s.query.eq_ignore_ascii_case(sq.query.trim()));
            if !sq.query.trim().is_empty() && !duplicate {
                sq.query = sq.query.trim().to_string();
                sub_queries.push(sq);
            }
        }

        if sub_queries.is_empty() {
            return Err(EngineError::ResponseParse {
                message: "response contained no usable sub-queries".to_string(),
                content: content.to_string(),
            });
        }

        sub_queries.sort_by_key(|sq| sq.priority);
        sub_queries.truncate(max.max(1));
        Ok(sub_queries)
    }
}

/// Returns the JSON payload: tagged block, fenced block, or the whole text.
fn extract_block(content: &str) -> &str {
    [&TAGGED_BLOCK, &FENCED_BLOCK]
        .into_iter()
        .filter_map(|re| re.as_ref())
        .find_map(|re| re.captures(content).and_then(|c| c.get(1)))
        .map_or_else(|| content.trim(), |m| m.as_str())
}

#[async_trait]
impl Agent for DecomposerAgent {
    fn name(&self) -> &'static str {
        "decomposer"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
