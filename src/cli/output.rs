//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or JSON. NDJSON is
//! used by streaming queries, one lifecycle event per line.

#![allow(clippy::format_push_string)]

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::core::{CognitiveLevel, LifecycleEvent, Mode, Response};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One compact JSON value per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` in this format's JSON flavour.
    ///
    /// `Text` renders pretty JSON too; callers only reach this for
    /// structured output.
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Renders a finished engine response.
#[must_use]
pub fn format_response(response: &Response, format: OutputFormat, verbose: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(response),
        OutputFormat::Text => {
            let mut output = String::new();
            if let Some(report) = &response.error {
                output.push_str(&format!(
                    "Error [{}]: {}\n",
                    report.category, report.message
                ));
            } else {
                output.push_str(&response.text);
                if !response.text.ends_with('\n') {
                    output.push('\n');
                }
            }

            let m = &response.metrics;
            let cache = if response.is_cache_hit() { " | cached" } else { "" };
            output.push_str(&format!(
                "\n---\nMode: {} ({}){cache} | Calls: {} | Tokens: {} | Time: {}ms\n",
                response.mode,
                response.cognitive_level,
                m.provider_calls,
                m.total_tokens,
                m.latency_ms
            ));
            if verbose {
                output.push_str(&format!("Trace: {}\n", response.trace_id));
                for (key, value) in &response.metadata {
                    let _ = writeln!(output, "  {key}: {value}");
                }
            }
            output
        }
    }
}

/// Renders one streamed lifecycle event, or `None` when the event has no
/// text rendering.
#[must_use]
pub fn format_event(event: &LifecycleEvent, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Json | OutputFormat::Ndjson => {
            Some(format!("{}\n", OutputFormat::Ndjson.to_json(event)))
        }
        OutputFormat::Text => match event {
            LifecycleEvent::PartialResult { content } => Some(content.clone()),
            LifecycleEvent::Error { report, .. } => {
                Some(format!("\nError [{}]: {}\n", report.category, report.message))
            }
            LifecycleEvent::End { .. } => Some("\n".to_string()),
            LifecycleEvent::Start { .. } | LifecycleEvent::Progress { .. } => None,
        },
    }
}

/// Renders a routing decision.
#[must_use]
pub fn format_route(
    query: &str,
    requested: Mode,
    mode: Mode,
    level: CognitiveLevel,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format!("{mode} ({level})\n"),
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(&serde_json::json!({
            "query": query,
            "requested_mode": requested,
            "mode": mode,
            "cognitive_level": level,
        })),
    }
}

/// Renders the tool mask of a mode.
#[must_use]
pub fn format_tools(mode: &str, tools: &[&str], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            for tool in tools {
                let _ = writeln!(output, "{tool}");
            }
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(&serde_json::json!({
            "mode": mode,
            "tools": tools,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("ndjson"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_format_tools_text() {
        let out = format_tools("code", &["respond", "code_execute"], OutputFormat::Text);
        assert_eq!(out, "respond\ncode_execute\n");
    }

    #[test]
    fn test_format_route_json() {
        let out = format_route(
            "Hello",
            Mode::Auto,
            Mode::Chat,
            CognitiveLevel::Fast,
            OutputFormat::Json,
        );
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["mode"], "chat");
        assert_eq!(value["requested_mode"], "auto");
    }

    #[test]
    fn test_format_event_text_skips_progress() {
        let progress = LifecycleEvent::progress("route", "resolved");
        assert!(format_event(&progress, OutputFormat::Text).is_none());

        let chunk = LifecycleEvent::PartialResult {
            content: "hi ".to_string(),
        };
        assert_eq!(format_event(&chunk, OutputFormat::Text).as_deref(), Some("hi "));
        assert!(
            format_event(&chunk, OutputFormat::Ndjson)
                .is_some_and(|line| line.ends_with('\n') && line.contains("partial_result"))
        );
    }
}
