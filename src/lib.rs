//! # cogroute
//!
//! Cognitive-effort routing engine for LLM requests.
//!
//! A query is resolved to a processing mode (chat, knowledge, search, code,
//! thinking or deep research) and a cognitive level, answered from the
//! response cache when possible, and otherwise dispatched to a strategy
//! that talks to language models through an ordered provider fallback
//! chain with per-provider retry.
//!
//! ## Modules
//!
//! - [`engine`]: top-level [`Engine`] with `process` and `process_stream`
//! - [`router`]: mode resolution and cache short-circuit
//! - [`cache`]: TTL + FIFO-bounded response cache
//! - [`resilience`]: error classification, backoff, provider fallback
//! - [`context`]: context engineering helpers
//! - [`strategy`]: per-mode handlers and external collaborators
//! - [`agent`]: agents, tools and the deep-research runtime
//! - [`llm`]: provider trait, messages and adapters
//! - [`config`]: engine configuration
//!
//! ## Example
//!
//! ```no_run
//! use cogroute::{Collaborators, Engine, EngineConfig, Request};
//!
//! # async fn run() -> Result<(), cogroute::EngineError> {
//! let config = EngineConfig::from_env()?;
//! let engine = Engine::from_config(&config, Collaborators::none())?;
//! let response = engine.process(Request::new("Hello")).await;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod engine;
pub mod error;
pub mod llm;
pub mod resilience;
pub mod router;
pub mod strategy;

#[cfg(test)]
mod test_support;

pub use cache::{CacheStats, ResponseCache};
pub use config::{EngineConfig, EngineConfigBuilder, ProviderConfig};
pub use self::core::{
    CognitiveLevel, LifecycleEvent, Mode, Priority, Request, Response, ResponseMetrics,
    SamplingParams,
};
pub use engine::{Engine, EventStream, Reply};
pub use error::{EngineError, Error, ErrorCategory, ErrorReport, Result};
pub use llm::{ChatRequest, ChatResponse, ChunkStream, LlmProvider};
pub use resilience::FallbackClient;
pub use router::{ModeRouter, RouterConfig};
pub use strategy::{CodeSandbox, Collaborators, Retriever, WebSearch};
