//! Strategy dispatch.
//!
//! One handler per concrete mode, held in a fixed [`StrategyTable`] and
//! selected by an exhaustive match on [`Mode`]. Handlers share the
//! provider chain, prompts and collaborators through [`Services`] and
//! report usage, events and side-channel metadata through a
//! [`StrategyContext`].

pub mod chat;
pub mod code;
pub mod collaborators;
pub mod knowledge;
pub mod search;
pub mod thinking;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::orchestrator::ResearchRuntime;
use crate::agent::prompt::PromptSet;
use crate::config::EngineConfig;
use crate::context::{ArchiveSink, ErrorPreservation, InstructionRandomizer};
use crate::core::{EventRecorder, LifecycleEvent, Mode, Request};
use crate::error::EngineError;
use crate::llm::message::{ChatRequest, TokenUsage, system_message, user_message};
use crate::resilience::FallbackClient;

pub use chat::ChatStrategy;
pub use code::CodeStrategy;
pub use collaborators::{
    CodeSandbox, Collaborators, Document, ExecutionOutput, Retriever, SearchHit, WebSearch,
};
pub use knowledge::KnowledgeStrategy;
pub use search::SearchStrategy;
pub use thinking::ThinkingStrategy;

/// Tunables read by strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySettings {
    /// Regeneration budget for inadequate answers.
    pub quality_retries: u32,
    /// Tool loop iteration cap.
    pub max_tool_iterations: usize,
    /// Research sub-query cap.
    pub max_sub_queries: usize,
    /// Research context size that triggers compression.
    pub context_compress_threshold: usize,
    /// Entries kept live on compression.
    pub context_keep_last: usize,
}

impl StrategySettings {
    /// Extracts the strategy tunables from an engine configuration.
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            quality_retries: config.quality_retries,
            max_tool_iterations: config.max_tool_iterations,
            max_sub_queries: config.max_sub_queries,
            context_compress_threshold: config.context_compress_threshold,
            context_keep_last: config.context_keep_last,
        }
    }
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            quality_retries: 1,
            max_tool_iterations: 8,
            max_sub_queries: 5,
            context_compress_threshold: 40,
            context_keep_last: 10,
        }
    }
}

/// Everything a strategy needs besides the request.
pub struct Services {
    /// Provider fallback chain.
    pub client: FallbackClient,
    /// System prompts.
    pub prompts: PromptSet,
    /// External collaborators.
    pub collaborators: Collaborators,
    /// Sink for archived context and research reports.
    pub archive: Arc<dyn ArchiveSink>,
    /// Tunables.
    pub settings: StrategySettings,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("client", &self.client)
            .field("collaborators", &self.collaborators)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Per-request state handed to a strategy.
///
/// `metadata` is the side-channel for intermediate results (sources,
/// reasoning, workflow state); it ends up in the response metadata even
/// when the strategy fails.
#[derive(Debug)]
pub struct StrategyContext<'a> {
    /// The request being processed.
    pub request: &'a Request,
    /// Resolved mode.
    pub mode: Mode,
    /// Event recorder (and optional stream subscriber).
    pub events: EventRecorder,
    /// Side-channel metadata.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Token usage accumulated over every model call.
    pub usage: TokenUsage,
    /// Number of model calls made.
    pub provider_calls: u32,
}

impl<'a> StrategyContext<'a> {
    /// Creates a context for `request` resolved to `mode`.
    #[must_use]
    pub fn new(request: &'a Request, mode: Mode, events: EventRecorder) -> Self {
        Self {
            request,
            mode,
            events,
            metadata: serde_json::Map::new(),
            usage: TokenUsage::default(),
            provider_calls: 0,
        }
    }

    /// Records one model call.
    pub const fn record_call(&mut self, usage: TokenUsage) {
        self.usage.accumulate(usage);
        self.provider_calls = self.provider_calls.saturating_add(1);
    }

    /// Emits a progress event.
    pub async fn progress(&mut self, stage: &str, message: impl Into<String>) {
        self.events
            .emit(LifecycleEvent::progress(stage, message))
            .await;
    }

    /// Stores a side-channel value.
    pub fn set_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
    }

    /// Builds a system + user request carrying the caller's sampling options.
    #[must_use]
    pub fn chat_request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        ChatRequest::new(vec![
            system_message(system_prompt),
            user_message(user_prompt),
        ])
        .with_sampling(self.request.sampling())
    }
}

/// A handler for one concrete mode.
#[async_trait]
pub trait StrategyHandler: Send + Sync {
    /// The mode this handler serves.
    fn mode(&self) -> Mode;

    /// Produces the result text for the request in `ctx`.
    async fn process(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError>;
}

/// Fixed mode → handler table.
#[derive(Debug)]
pub struct StrategyTable {
    chat: ChatStrategy,
    knowledge: KnowledgeStrategy,
    search: SearchStrategy,
    code: CodeStrategy,
    thinking: ThinkingStrategy,
    research: ResearchRuntime,
}

impl StrategyTable {
    /// Builds every handler over shared services.
    #[must_use]
    pub fn new(services: &Arc<Services>) -> Self {
        Self {
            chat: ChatStrategy::new(Arc::clone(services)),
            knowledge: KnowledgeStrategy::new(Arc::clone(services)),
            search: SearchStrategy::new(Arc::clone(services)),
            code: CodeStrategy::new(Arc::clone(services)),
            thinking: ThinkingStrategy::new(Arc::clone(services)),
            research: ResearchRuntime::new(Arc::clone(services)),
        }
    }

    /// The handler for a resolved mode.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] for `Auto`, which must be
    /// resolved by the router first.
    pub fn handler(&self, mode: Mode) -> Result<&dyn StrategyHandler, EngineError> {
        Ok(match mode {
            Mode::Auto => {
                return Err(EngineError::invalid_request(
                    "AUTO must be resolved before dispatch",
                ));
            }
            Mode::Chat => &self.chat,
            Mode::Knowledge => &self.knowledge,
            Mode::Search => &self.search,
            Mode::Code => &self.code,
            Mode::Thinking => &self.thinking,
            Mode::DeepResearch => &self.research,
        })
    }

    /// The CHAT handler, used directly for streaming.
    #[must_use]
    pub const fn chat(&self) -> &ChatStrategy {
        &self.chat
    }
}

/// Runs `call` and regenerates while the answer is inadequate.
///
/// `call` receives the prompt to send and returns the answer with its
/// usage. Retry prompts embed the failed attempt and are wrapped by the
/// instruction randomizer. After the budget is spent the last answer is
/// returned as-is.
pub(crate) async fn with_quality_retry<F, Fut>(
    ctx: &mut StrategyContext<'_>,
    max_retries: u32,
    prompt: &str,
    mut call: F,
) -> Result<String, EngineError>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = Result<(String, TokenUsage), EngineError>> + Send,
{
    let preservation = ErrorPreservation::default();
    let mut randomizer = InstructionRandomizer::new();
    let mut attempt: u32 = 0;
    let mut next_prompt = prompt.to_string();

    loop {
        let (answer, usage) = call(next_prompt).await?;
        ctx.record_call(usage);

        if !preservation.should_retry(&answer, max_retries, attempt) {
            return Ok(answer);
        }

        attempt += 1;
        debug!(attempt, len = answer.len(), "inadequate answer; regenerating");
        ctx.progress("quality_retry", format!("regenerating (attempt {attempt})"))
            .await;
        next_prompt = randomizer.wrap_instruction(&preservation.build_retry_prompt(
            prompt,
            &answer,
            Some("The answer was empty or too short."),
        ));
    }
}

/// Single-shot generation with quality retry.
pub(crate) async fn generate(
    services: &Services,
    ctx: &mut StrategyContext<'_>,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, EngineError> {
    let base = ctx.chat_request(system_prompt, "");
    let client = &services.client;
    with_quality_retry(
        ctx,
        services.settings.quality_retries,
        user_prompt,
        |prompt| {
            let mut request = base.clone();
            if let Some(last) = request.messages.last_mut() {
                last.content = prompt;
            }
            async move {
                let response = client.chat(&request).await?;
                Ok((response.content, response.usage))
            }
        },
    )
    .await
}
