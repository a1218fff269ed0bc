//! Agents and the deep-research runtime.
//!
//! # Architecture
//!
//! ```text
//! DEEP_RESEARCH request → ResearchRuntime
//!   ├── PlannerAgent (checklist plan, seeds plan recitation)
//!   ├── DecomposerAgent (<subqueries> block → Vec<SubQuery>)
//!   ├── SearchStrategy per sub-query, priority order → Vec<Finding>
//!   └── SynthesizerAgent → report, archived at research/<trace_id>/report.md
//! ```
//!
//! The CODE strategy reuses the same [`Agent`] trait with tools and the
//! [`agentic_loop`](agentic_loop::agentic_loop).

pub mod agentic_loop;
pub mod decomposer;
pub mod executor;
pub mod finding;
pub mod orchestrator;
pub mod primary;
pub mod prompt;
pub mod synthesizer;
pub mod tool;
pub mod traits;
pub mod workflow;

pub use decomposer::DecomposerAgent;
pub use executor::ToolExecutor;
pub use finding::{Finding, SubQuery};
pub use orchestrator::ResearchRuntime;
pub use primary::PlannerAgent;
pub use prompt::PromptSet;
pub use synthesizer::SynthesizerAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse, execute_with_tools};
pub use workflow::{WorkflowState, WorkflowStatus, WorkflowStep};
