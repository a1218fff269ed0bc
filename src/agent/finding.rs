//! Data types for research sub-queries and their findings.

use serde::{Deserialize, Serialize};

use crate::core::Priority;

/// Maximum byte length of a sub-query or goal string.
const MAX_FIELD_LEN: usize = 1_000;

/// A search sub-query proposed by the decomposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    /// Search engine query.
    pub query: String,
    /// What this search should establish.
    #[serde(default)]
    pub goal: String,
    /// Execution priority.
    #[serde(default, deserialize_with = "deserialize_priority")]
    pub priority: Priority,
}

impl SubQuery {
    /// Creates a sub-query.
    pub fn new(query: impl Into<String>, goal: impl Into<String>, priority: Priority) -> Self {
        Self {
            query: query.into(),
            goal: goal.into(),
            priority,
        }
    }

    /// The single sub-query used when decomposition fails.
    #[must_use]
    pub fn fallback(question: &str) -> Self {
        Self::new(question, "Answer the research question directly", Priority::High)
    }

    /// Truncates oversized fields in place.
    pub(crate) fn sanitize(&mut self) {
        truncate_on_char_boundary(&mut self.query, MAX_FIELD_LEN);
        truncate_on_char_boundary(&mut self.goal, MAX_FIELD_LEN);
    }
}

/// Accepts any priority spelling the model produces (`"HIGH"`, `1`, ...).
fn deserialize_priority<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Priority::parse(&s),
        serde_json::Value::Number(n) => Priority::parse(&n.to_string()),
        _ => Priority::default(),
    })
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
}

/// The outcome of one sub-query search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The sub-query that was searched.
    pub sub_query: SubQuery,
    /// Search answer text (empty on failure).
    pub content: String,
    /// Error message when the search failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Finding {
    /// A successful search.
    pub fn success(sub_query: SubQuery, content: impl Into<String>) -> Self {
        Self {
            sub_query,
            content: content.into(),
            error: None,
        }
    }

    /// A failed search.
    pub fn failure(sub_query: SubQuery, error: impl Into<String>) -> Self {
        Self {
            sub_query,
            content: String::new(),
            error: Some(error.into()),
        }
    }

    /// Whether the search succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
