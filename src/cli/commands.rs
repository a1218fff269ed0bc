//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use crate::agent::prompt::PromptSet;
use crate::cache::ResponseCache;
use crate::cli::output::{OutputFormat, format_event, format_response, format_route, format_tools};
use crate::cli::parser::{Cli, Commands};
use crate::config::EngineConfig;
use crate::context::allowed_tools;
use crate::core::{LifecycleEvent, Mode, Request, SamplingParams};
use crate::engine::{Engine, EventStream, Reply};
use crate::error::{CommandError, Result};
use crate::router::{ModeRouter, RouterConfig};
use crate::strategy::Collaborators;

/// Parameters for the query command.
#[derive(Debug, Clone, Default)]
pub struct QueryCommandParams<'a> {
    /// The query text.
    pub query: &'a str,
    /// Requested mode name.
    pub mode: &'a str,
    /// Stream lifecycle events.
    pub stream: bool,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Show detailed diagnostics.
    pub verbose: bool,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Query {
            query,
            mode,
            stream,
            temperature,
            max_tokens,
            prompt_dir,
        } => {
            let params = QueryCommandParams {
                query,
                mode,
                stream: *stream,
                temperature: *temperature,
                max_tokens: *max_tokens,
                prompt_dir: prompt_dir.as_deref(),
                verbose: cli.verbose,
            };
            cmd_query(&params, format)
        }
        Commands::Route { query, mode } => cmd_route(query, mode, format),
        Commands::Tools { mode } => Ok(cmd_tools(mode, format)),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn parse_mode(name: &str) -> Result<Mode> {
    name.parse::<Mode>()
        .map_err(|e| CommandError::InvalidArgument(e.to_string()).into())
}

// ==================== Query Command ====================

fn cmd_query(params: &QueryCommandParams<'_>, format: OutputFormat) -> Result<String> {
    let mode = parse_mode(params.mode)?;

    let mut builder = EngineConfig::builder();
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Engine configuration error: {e}"))
    })?;

    let engine = Engine::from_config(&config, Collaborators::none()).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;

    let request = Request::new(params.query)
        .with_mode(mode)
        .with_sampling(SamplingParams {
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout: None,
        })
        .streaming(params.stream);

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let engine = Arc::new(engine);
    match rt.block_on(engine.handle(request)) {
        Reply::Events(events) => rt.block_on(write_events(events, format)),
        Reply::Complete(response) => match &response.error {
            Some(report) if format == OutputFormat::Text => Err(CommandError::ExecutionFailed(
                format!(
                    "Query failed [{}]: {} (trace {})",
                    report.category, report.message, report.trace_id
                ),
            )
            .into()),
            Some(_) => Err(CommandError::ExecutionFailed(format.to_json(&response)).into()),
            None => Ok(format_response(&response, format, params.verbose)),
        },
    }
}

/// Writes events to stdout as they arrive.
async fn write_events(mut events: EventStream, format: OutputFormat) -> Result<String> {
    let mut stdout = io::stdout();
    let mut failure = None;

    while let Some(event) = events.next().await {
        if let Some(rendered) = format_event(&event, format) {
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
        if let LifecycleEvent::Error { report, .. } = event {
            failure = Some(report);
        }
    }

    match failure {
        Some(report) => Err(CommandError::ExecutionFailed(format!(
            "Query failed [{}]: {} (trace {})",
            report.category, report.message, report.trace_id
        ))
        .into()),
        None => Ok(String::new()),
    }
}

// ==================== Routing Commands ====================

fn cmd_route(query: &str, mode: &str, format: OutputFormat) -> Result<String> {
    let requested = parse_mode(mode)?;
    let router = ModeRouter::new(
        RouterConfig::default(),
        Arc::new(ResponseCache::new(Duration::ZERO, 0)),
    );
    let request = Request::new(query).with_mode(requested);
    let (resolved, level) = router.resolve(&request);
    Ok(format_route(query, requested, resolved, level, format))
}

fn cmd_tools(mode: &str, format: OutputFormat) -> String {
    let name = mode
        .parse::<Mode>()
        .map_or_else(|_| mode.trim().to_lowercase(), |m| m.as_str().to_string());
    format_tools(&name, allowed_tools(&name), format)
}

// ==================== Prompt Templates ====================

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine config directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");
                output.push_str("  ");
                output.push_str(name);
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize strategy prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_text() {
        let out = cmd_route("Hello", "auto", OutputFormat::Text).unwrap_or_default();
        assert_eq!(out, "chat (fast)\n");

        let out = cmd_route("Hello", "code", OutputFormat::Text).unwrap_or_default();
        assert_eq!(out, "code (analytic)\n");
    }

    #[test]
    fn test_route_rejects_unknown_mode() {
        assert!(cmd_route("Hello", "telepathy", OutputFormat::Text).is_err());
    }

    #[test]
    fn test_tools_normalizes_mode_name() {
        assert_eq!(
            cmd_tools("Deep-Research", OutputFormat::Text).lines().count(),
            5
        );
        assert_eq!(cmd_tools("nonsense", OutputFormat::Text), "respond\n");
    }

    #[test]
    fn test_init_prompts_twice() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text).unwrap_or_default();
        assert!(first.starts_with("Wrote 8 prompt template(s)"));

        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Json).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&second).unwrap_or_default();
        assert_eq!(value["count"], 0);
    }
}
