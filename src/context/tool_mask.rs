//! Tool-availability mask.
//!
//! Fixed mapping from mode name to the tools the model may use in it.

use crate::agent::tool::{
    ALL_TOOLS, CODE_ANALYZE, CODE_EXECUTE, RESPOND, ToolDefinition, WEB_FETCH, WEB_SEARCH,
};
use crate::core::Mode;

/// Anything that has a tool name.
pub trait ToolName {
    /// The tool's name.
    fn tool_name(&self) -> &str;
}

impl ToolName for ToolDefinition {
    fn tool_name(&self) -> &str {
        &self.name
    }
}

impl ToolName for &str {
    fn tool_name(&self) -> &str {
        self
    }
}

impl ToolName for String {
    fn tool_name(&self) -> &str {
        self
    }
}

/// Tools allowed for `mode`. Unknown modes get `respond` only.
#[must_use]
pub fn allowed_tools(mode: &str) -> &'static [&'static str] {
    match mode {
        "code" => &[RESPOND, CODE_EXECUTE, CODE_ANALYZE],
        "search" => &[RESPOND, WEB_SEARCH, WEB_FETCH],
        "deep_research" => &ALL_TOOLS,
        _ => &[RESPOND],
    }
}

/// Tools allowed for a typed mode.
#[must_use]
pub fn allowed_for(mode: Mode) -> &'static [&'static str] {
    allowed_tools(mode.as_str())
}

/// Filters `tools` down to those allowed for `mode`, keeping order.
#[must_use]
pub fn apply_mask<T: ToolName + Clone>(mode: &str, tools: &[T]) -> Vec<T> {
    let allowed = allowed_tools(mode);
    tools
        .iter()
        .filter(|t| allowed.contains(&t.tool_name()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::agent::tool::ToolSet;

    #[test]
    fn test_chat_mask() {
        assert_eq!(apply_mask("chat", &["respond", "web_search"]), vec!["respond"]);
    }

    #[test]
    fn test_deep_research_keeps_everything() {
        let tools = ToolSet::all().into_definitions();
        assert_eq!(apply_mask("deep_research", &tools), tools);
    }

    #[test_case("code", &["respond", "code_execute", "code_analyze"])]
    #[test_case("search", &["respond", "web_search", "web_fetch"])]
    #[test_case("knowledge", &["respond"])]
    #[test_case("thinking", &["respond"])]
    #[test_case("nonsense", &["respond"])]
    fn test_allowed_tools(mode: &str, expected: &[&str]) {
        assert_eq!(allowed_tools(mode), expected);
    }

    #[test]
    fn test_mask_filters_definitions() {
        let masked = apply_mask(Mode::Code.as_str(), ToolSet::all().definitions());
        let names: Vec<&str> = masked.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["code_execute", "code_analyze"]);
        assert_eq!(allowed_for(Mode::Search).len(), 3);
    }
}
