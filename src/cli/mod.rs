//! CLI layer for cogroute.
//!
//! Provides the command-line interface using clap, with commands
//! for querying the engine, inspecting routing and writing prompts.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
