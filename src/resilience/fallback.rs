//! Ordered multi-provider fallback.
//!
//! Each provider is tried with its own retry budget. Retryable failures
//! that exhaust the budget fall through to the next provider; a
//! non-retryable failure ends the call immediately, since another provider
//! would reject the same input.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{Instrument, debug, info_span, warn};

use super::classify::is_retryable;
use super::retry::{RetryPolicy, retry_with_backoff};
use crate::config::EngineConfig;
use crate::core::SamplingParams;
use crate::error::{EngineError, ProviderFailure};
use crate::llm::client::create_chain;
use crate::llm::message::{ChatRequest, ChatResponse};
use crate::llm::provider::{ChunkStream, LlmProvider};

/// Provider chain with per-provider retry and per-attempt timeout.
#[derive(Clone)]
pub struct FallbackClient {
    providers: Vec<Arc<dyn LlmProvider>>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for FallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackClient")
            .field("providers", &self.provider_names())
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FallbackClient {
    /// Creates a client over `providers`, tried in list order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoProviders`] if `providers` is empty.
    pub fn new(
        providers: Vec<Arc<dyn LlmProvider>>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        if providers.is_empty() {
            return Err(EngineError::NoProviders);
        }
        Ok(Self {
            providers,
            policy,
            timeout,
        })
    }

    /// Builds the configured provider chain.
    ///
    /// # Errors
    ///
    /// Returns provider factory errors.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            create_chain(config)?,
            RetryPolicy::new(config.max_retries, config.retry_base_delay),
            config.timeout,
        )
    }

    /// Provider names in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Runs a chat completion against the chain.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or
    /// [`EngineError::FallbackExhausted`] once every provider has spent its
    /// retry budget.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        let deadline = request.timeout.unwrap_or(self.timeout);
        let mut failures = Vec::new();

        for provider in &self.providers {
            let span = info_span!("provider", provider = provider.name());
            let result = retry_with_backoff(&self.policy, || {
                attempt(provider.as_ref(), request, deadline)
            })
            .instrument(span)
            .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider exhausted; falling back");
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(EngineError::FallbackExhausted { failures })
    }

    /// Generates text for a single user prompt.
    ///
    /// # Errors
    ///
    /// Same as [`chat`](Self::chat).
    pub async fn generate(
        &self,
        prompt: &str,
        options: &SamplingParams,
    ) -> Result<String, EngineError> {
        let request = ChatRequest::from_prompt(prompt).with_sampling(options);
        self.chat(&request).await.map(|r| r.content)
    }

    /// Streams a chat completion from the first provider that produces output.
    ///
    /// Fallback applies only until the first chunk arrives. Once a provider
    /// has emitted output, its later failures are yielded as stream items
    /// and no other provider is tried. Every later chunk must arrive within
    /// the same deadline; a stall yields [`EngineError::Timeout`] and ends
    /// the stream.
    ///
    /// # Errors
    ///
    /// Same as [`chat`](Self::chat), for failures before the first chunk.
    pub async fn generate_stream(&self, request: &ChatRequest) -> Result<ChunkStream, EngineError> {
        let deadline = request.timeout.unwrap_or(self.timeout);
        let mut failures = Vec::new();

        for provider in &self.providers {
            let span = info_span!("provider", provider = provider.name());
            let result = retry_with_backoff(&self.policy, || {
                open_stream(provider.as_ref(), request, deadline)
            })
            .instrument(span)
            .await;

            match result {
                Ok((first, rest)) => {
                    debug!(provider = provider.name(), "stream opened");
                    let head = stream::iter(first.map(Ok));
                    let rest = with_chunk_deadline(rest, provider.name(), deadline);
                    return Ok(Box::pin(head.chain(rest)));
                }
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "stream failed before output; falling back");
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(EngineError::FallbackExhausted { failures })
    }
}

async fn attempt(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<ChatResponse, EngineError> {
    tokio::time::timeout(deadline, provider.generate(request))
        .await
        .map_err(|_| EngineError::Timeout {
            provider: provider.name().to_string(),
            elapsed: deadline,
        })?
}

/// Opens a stream and waits for its first chunk, both under `deadline`.
///
/// An error before the first chunk counts as a failed attempt. An empty
/// stream is a success with no output.
async fn open_stream(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
    deadline: Duration,
) -> Result<(Option<String>, ChunkStream), EngineError> {
    let opened = async {
        let mut stream = provider.generate_stream(request).await?;
        match stream.next().await {
            Some(Ok(chunk)) => Ok((Some(chunk), stream)),
            Some(Err(e)) => Err(e),
            None => Ok((None, stream)),
        }
    };
    tokio::time::timeout(deadline, opened)
        .await
        .map_err(|_| EngineError::Timeout {
            provider: provider.name().to_string(),
            elapsed: deadline,
        })?
}

/// Bounds the wait for each chunk of `stream` by `deadline`.
fn with_chunk_deadline(stream: ChunkStream, provider: &str, deadline: Duration) -> ChunkStream {
    let provider = provider.to_string();
    Box::pin(stream::unfold(Some(stream), move |state| {
        let provider = provider.clone();
        async move {
            let mut inner = state?;
            match tokio::time::timeout(deadline, inner.next()).await {
                Ok(Some(item)) => Some((item, Some(inner))),
                Ok(None) => None,
                Err(_) => {
                    warn!(provider = %provider, "stream stalled mid-response");
                    let elapsed = EngineError::Timeout {
                        provider,
                        elapsed: deadline,
                    };
                    Some((Err(elapsed), None))
                }
            }
        }
    }))
}
