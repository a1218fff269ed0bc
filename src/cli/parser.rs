//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cogroute: cognitive-effort routing for LLM requests.
///
/// Resolves how much effort a query deserves, dispatches it to a matching
/// strategy and survives provider failures through an ordered fallback
/// chain. Providers are configured through environment variables
/// (`OPENAI_API_KEY`, `COGROUTE_MODEL`, `COGROUTE_FALLBACK_API_KEY`, ...).
#[derive(Parser, Debug)]
#[command(name = "cogroute")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query through the engine.
    ///
    /// The mode defaults to `auto`, which lets the router pick one from the
    /// query text. Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  cogroute query "Hello"                                   # Routed automatically
  cogroute query "Why do stars twinkle?" --mode thinking   # Explicit mode
  cogroute query "Tell me a story" --stream                # Stream chunks as they arrive
  cogroute query "Summarize Rust 2024" --max-tokens 300 --temperature 0.2
  cogroute --format json query "Hello" | jq '.metrics'
  OPENAI_API_KEY=sk-... COGROUTE_FALLBACK_API_KEY=sk-... cogroute query "Hi"
"#)]
    Query {
        /// The query text.
        query: String,

        /// Processing mode (auto, chat, knowledge, search, code, thinking,
        /// deep_research).
        #[arg(short, long, default_value = "auto")]
        mode: String,

        /// Stream lifecycle events while the request runs.
        #[arg(short, long)]
        stream: bool,

        /// Sampling temperature.
        #[arg(long)]
        temperature: Option<f32>,

        /// Maximum tokens to generate.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Directory containing prompt template files.
        #[arg(long, env = "COGROUTE_PROMPT_DIR")]
        prompt_dir: Option<PathBuf>,
    },

    /// Show the mode and cognitive level a query resolves to.
    ///
    /// Pure routing: no provider is contacted and no API key is needed.
    #[command(after_help = r#"Examples:
  cogroute route "Hello"                       # chat (fast)
  cogroute route "Why is the sky blue?"        # thinking (agentic)
  cogroute route "Hello" --mode code          # code (analytic)
  cogroute --format json route "compare tokio and smol"
"#)]
    Route {
        /// The query text.
        query: String,

        /// Requested mode; explicit modes are kept as-is.
        #[arg(short, long, default_value = "auto")]
        mode: String,
    },

    /// List the tools a mode may use.
    #[command(after_help = r#"Examples:
  cogroute tools code            # respond, code_execute, code_analyze
  cogroute tools deep_research   # every tool
  cogroute tools chat            # respond only
"#)]
    Tools {
        /// Mode name. Unknown names get `respond` only.
        mode: String,
    },

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are left untouched. Edit the written files to
    /// customize strategy and research prompts.
    #[command(after_help = r#"Examples:
  cogroute init-prompts                    # ~/.config/cogroute/prompts
  cogroute init-prompts --dir ./prompts    # Custom directory
"#)]
    InitPrompts {
        /// Target directory (defaults to the user config directory).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
