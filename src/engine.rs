//! Top-level entry point.
//!
//! [`Engine`] ties the router, the response cache and the strategy table
//! together. [`Engine::process`] answers a request with a [`Response`];
//! [`Engine::process_stream`] runs the same pipeline on a spawned task and
//! hands the caller the lifecycle events as they occur.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::agent::prompt::PromptSet;
use crate::cache::{CacheStats, ResponseCache};
use crate::config::EngineConfig;
use crate::context::{ArchiveSink, FsArchive, MemoryArchive};
use crate::core::{
    CognitiveLevel, EventRecorder, LifecycleEvent, Mode, Request, Response, ResponseMetrics,
};
use crate::error::{EngineError, ErrorReport};
use crate::llm::message::TokenUsage;
use crate::llm::provider::LlmProvider;
use crate::resilience::{FallbackClient, RetryPolicy};
use crate::router::{ModeRouter, Route, RouterConfig};
use crate::strategy::{Collaborators, Services, StrategyContext, StrategySettings, StrategyTable};

/// Queries longer than this many bytes are rejected.
pub const MAX_QUERY_BYTES: usize = 10_000;

/// Stream of lifecycle events for one request.
pub type EventStream = ReceiverStream<LifecycleEvent>;

/// What [`Engine::handle`] hands back for a request.
#[derive(Debug)]
pub enum Reply {
    /// The finished response of a non-streaming request.
    Complete(Box<Response>),
    /// Lifecycle events of a streaming request, ending in one terminal event.
    Events(EventStream),
}

/// Request-processing engine.
#[derive(Debug)]
pub struct Engine {
    router: ModeRouter,
    table: StrategyTable,
    services: Arc<Services>,
    event_buffer: usize,
}

impl Engine {
    /// Builds an engine over the configured provider chain.
    ///
    /// # Errors
    ///
    /// Returns provider factory errors.
    pub fn from_config(
        config: &EngineConfig,
        collaborators: Collaborators,
    ) -> Result<Self, EngineError> {
        let client = FallbackClient::from_config(config)?;
        Ok(Self::with_client(config, client, collaborators))
    }

    /// Builds an engine over explicit provider instances, tried in order.
    ///
    /// The provider entries of `config` are ignored; its retry and timeout
    /// settings still apply.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoProviders`] if `providers` is empty.
    pub fn with_providers(
        config: &EngineConfig,
        providers: Vec<Arc<dyn LlmProvider>>,
        collaborators: Collaborators,
    ) -> Result<Self, EngineError> {
        let client = FallbackClient::new(
            providers,
            RetryPolicy::new(config.max_retries, config.retry_base_delay),
            config.timeout,
        )?;
        Ok(Self::with_client(config, client, collaborators))
    }

    /// Builds an engine over a ready-made fallback client.
    #[must_use]
    pub fn with_client(
        config: &EngineConfig,
        client: FallbackClient,
        collaborators: Collaborators,
    ) -> Self {
        let archive: Arc<dyn ArchiveSink> = match &config.archive_dir {
            Some(dir) => Arc::new(FsArchive::new(dir.clone())),
            None => Arc::new(MemoryArchive::new()),
        };
        let services = Arc::new(Services {
            client,
            prompts: PromptSet::load(config.prompt_dir.as_deref()),
            collaborators,
            archive,
            settings: StrategySettings::from_config(config),
        });
        let cache = Arc::new(ResponseCache::new(config.cache_ttl, config.cache_capacity));
        let router = ModeRouter::new(
            RouterConfig {
                length_threshold: config.route_length_threshold,
            },
            cache,
        );

        Self {
            table: StrategyTable::new(&services),
            router,
            services,
            event_buffer: config.event_buffer.max(1),
        }
    }

    /// Resolves the mode a request would be dispatched to, without
    /// consulting the cache or calling a model.
    #[must_use]
    pub fn resolve(&self, request: &Request) -> (Mode, CognitiveLevel) {
        self.router.resolve(request)
    }

    /// Snapshot of the response cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.router.cache().stats()
    }

    /// The archive sink holding compressed context and research reports.
    #[must_use]
    pub fn archive(&self) -> &Arc<dyn ArchiveSink> {
        &self.services.archive
    }

    /// Single entry point: streams when the request asked for it, otherwise
    /// runs it to completion.
    pub async fn handle(self: &Arc<Self>, request: Request) -> Reply {
        if request.is_streaming() {
            Reply::Events(self.process_stream(request))
        } else {
            Reply::Complete(Box::new(self.process(request).await))
        }
    }

    /// Processes a request to completion.
    ///
    /// Never fails: a terminal failure is reported in [`Response::error`]
    /// with the metadata gathered up to that point.
    pub async fn process(&self, request: Request) -> Response {
        self.run(&request, EventRecorder::new()).await
    }

    /// Processes a request on a spawned task, streaming its lifecycle events.
    ///
    /// The stream ends after exactly one terminal event (`End` or `Error`).
    /// CHAT requests stream provider chunks as `PartialResult` events; other
    /// modes deliver the final text as one `PartialResult`. Dropping the
    /// stream does not cancel the request. The terminal event carries the
    /// final response metadata, so nothing the response would hold is lost.
    pub fn process_stream(self: &Arc<Self>, request: Request) -> EventStream {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let response = engine
                .run(&request, EventRecorder::with_subscriber(tx))
                .await;
            debug!(trace_id = %response.trace_id, "stream finished");
        });
        ReceiverStream::new(rx)
    }

    async fn run(&self, request: &Request, mut events: EventRecorder) -> Response {
        let started = Instant::now();
        let streaming = events.has_subscriber();
        events
            .emit(LifecycleEvent::Start {
                trace_id: request.trace_id().to_string(),
                requested_mode: request.mode(),
            })
            .await;

        if let Err(e) = validate(request) {
            let (mode, level) = self.router.resolve(request);
            let mut ctx = StrategyContext::new(request, mode, events);
            return self.finish(&mut ctx, level, Err(e), false, started).await;
        }

        let Route {
            mode,
            level,
            cached,
        } = self.router.route(request);
        let mut ctx = StrategyContext::new(request, mode, events);
        ctx.progress("route", format!("resolved to {mode} ({level})"))
            .await;

        if let Some(text) = cached {
            if streaming {
                ctx.events
                    .emit(LifecycleEvent::PartialResult {
                        content: text.clone(),
                    })
                    .await;
            }
            return self.finish(&mut ctx, level, Ok(text), true, started).await;
        }

        let result = if streaming && mode == Mode::Chat {
            self.stream_chat(&mut ctx).await
        } else {
            match self.table.handler(mode) {
                Ok(handler) => handler.process(&mut ctx).await,
                Err(e) => Err(e),
            }
        };

        if let Ok(text) = &result {
            self.router.cache().put(request.query(), mode, text.as_str());
            if streaming && mode != Mode::Chat {
                ctx.events
                    .emit(LifecycleEvent::PartialResult {
                        content: text.clone(),
                    })
                    .await;
            }
        }

        self.finish(&mut ctx, level, result, false, started).await
    }

    /// Forwards CHAT provider chunks as partial results and returns the
    /// concatenated text. A failure after the first chunk ends the request.
    async fn stream_chat(&self, ctx: &mut StrategyContext<'_>) -> Result<String, EngineError> {
        let mut chunks = self.table.chat().stream(ctx.request).await?;
        ctx.record_call(TokenUsage::default());

        let mut text = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            text.push_str(&chunk);
            ctx.events
                .emit(LifecycleEvent::PartialResult { content: chunk })
                .await;
        }
        Ok(text)
    }

    async fn finish(
        &self,
        ctx: &mut StrategyContext<'_>,
        level: CognitiveLevel,
        result: Result<String, EngineError>,
        cache_hit: bool,
        started: Instant,
    ) -> Response {
        let trace_id = ctx.request.trace_id().to_string();
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        ctx.set_metadata("cache_hit", Value::Bool(cache_hit));
        let metadata = ctx.metadata.clone();

        let (text, error) = match result {
            Ok(text) => {
                ctx.events
                    .emit(LifecycleEvent::End {
                        trace_id: trace_id.clone(),
                        mode: ctx.mode,
                        cache_hit,
                        metadata,
                    })
                    .await;
                info!(
                    trace_id = %trace_id,
                    mode = %ctx.mode,
                    cache_hit,
                    latency_ms,
                    provider_calls = ctx.provider_calls,
                    "request completed"
                );
                (text, None)
            }
            Err(e) => {
                let report = ErrorReport::from_error(&e, &trace_id);
                warn!(
                    trace_id = %trace_id,
                    mode = %ctx.mode,
                    category = %report.category,
                    error = %e,
                    "request failed"
                );
                ctx.events
                    .emit(LifecycleEvent::Error {
                        report: report.clone(),
                        metadata,
                    })
                    .await;
                (String::new(), Some(report))
            }
        };

        let events = std::mem::take(&mut ctx.events).into_events();
        debug!(trace_id = %trace_id, events = events.len(), "events recorded");

        Response {
            text,
            mode: ctx.mode,
            cognitive_level: level,
            trace_id,
            metrics: ResponseMetrics {
                prompt_tokens: ctx.usage.prompt_tokens,
                completion_tokens: ctx.usage.completion_tokens,
                total_tokens: ctx.usage.total_tokens,
                provider_calls: ctx.provider_calls,
                latency_ms,
            },
            events,
            metadata: std::mem::take(&mut ctx.metadata),
            error,
        }
    }
}

fn validate(request: &Request) -> Result<(), EngineError> {
    let query = request.query();
    if query.trim().is_empty() {
        return Err(EngineError::invalid_request("query is empty"));
    }
    if query.len() > MAX_QUERY_BYTES {
        return Err(EngineError::invalid_request(format!(
            "query is {} bytes; the limit is {MAX_QUERY_BYTES}",
            query.len()
        )));
    }
    Ok(())
}
